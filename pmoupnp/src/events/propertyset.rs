use crate::soap::element_to_string;
use xmltree::{Element, XMLNode};

const EVENT_NS: &str = "urn:schemas-upnp-org:event-1-0";

/// Corps d'un `NOTIFY` : un `e:propertyset` avec une propriété par variable
pub fn build_propertyset(values: &[(String, String)]) -> Result<String, xmltree::Error> {
    let mut propertyset = Element::new("e:propertyset");
    propertyset
        .attributes
        .insert("xmlns:e".to_string(), EVENT_NS.to_string());

    for (name, value) in values {
        let mut variable = Element::new(name);
        variable.children.push(XMLNode::Text(value.clone()));

        let mut property = Element::new("e:property");
        property.children.push(XMLNode::Element(variable));
        propertyset.children.push(XMLNode::Element(property));
    }

    element_to_string(&propertyset, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propertyset() {
        let xml = build_propertyset(&[
            ("TransportState".to_string(), "Playing".to_string()),
            ("Metadata".to_string(), "<DIDL-Lite/>".to_string()),
        ])
        .unwrap();

        assert!(xml.contains(r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">"#));
        assert!(xml.contains("<TransportState>Playing</TransportState>"));
        assert!(xml.contains("&lt;DIDL-Lite/&gt;"));
    }
}
