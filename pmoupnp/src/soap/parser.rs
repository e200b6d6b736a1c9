//! Parser SOAP pour actions UPnP

use std::collections::HashMap;
use std::io::BufReader;
use xmltree::Element;

/// Action UPnP extraite d'une enveloppe SOAP
#[derive(Debug, Clone)]
pub struct SoapAction {
    /// Nom de l'action (ex: "Insert", "SetAVTransportURI")
    pub name: String,

    /// Namespace de l'action (ex: "urn:av-openhome-org:service:Playlist:1")
    pub namespace: Option<String>,

    /// Arguments de l'action
    pub args: HashMap<String, String>,
}

/// Erreur de parsing SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("No action found in SOAP Body")]
    NoAction,
}

/// Parse une action SOAP à partir de bytes XML
pub fn parse_soap_action(xml: &[u8]) -> Result<SoapAction, SoapParseError> {
    let body = parse_soap_body(xml)?;
    extract_action_from_body(&body)
}

/// Extrait le corps d'une enveloppe SOAP
fn parse_soap_body(xml: &[u8]) -> Result<Element, SoapParseError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if !root.name.ends_with("Envelope") {
        return Err(SoapParseError::MissingEnvelope);
    }

    root.children
        .iter()
        .find_map(|n| n.as_element().filter(|e| e.name.ends_with("Body")))
        .cloned()
        .ok_or(SoapParseError::MissingBody)
}

/// Extrait l'action UPnP du corps SOAP
fn extract_action_from_body(body: &Element) -> Result<SoapAction, SoapParseError> {
    // Format: <u:ActionName xmlns:u="service-urn">...</u:ActionName>
    let action_elem = body
        .children
        .iter()
        .find_map(|n| n.as_element())
        .ok_or(SoapParseError::NoAction)?;

    let args = action_elem
        .children
        .iter()
        .filter_map(|child| child.as_element())
        .map(|elem| {
            let value = elem.get_text().unwrap_or_default().to_string();
            (elem.name.clone(), value)
        })
        .collect();

    Ok(SoapAction {
        name: action_elem.name.clone(),
        namespace: action_elem.namespace.clone(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_action() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Insert xmlns:u="urn:av-openhome-org:service:Playlist:1">
      <AfterId>0</AfterId>
      <Uri>http://host/a.flac</Uri>
      <Metadata></Metadata>
    </u:Insert>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "Insert");
        assert_eq!(
            action.namespace,
            Some("urn:av-openhome-org:service:Playlist:1".to_string())
        );
        assert_eq!(action.args.get("AfterId"), Some(&"0".to_string()));
        assert_eq!(action.args.get("Uri"), Some(&"http://host/a.flac".to_string()));
        assert_eq!(action.args.get("Metadata"), Some(&String::new()));
    }

    #[test]
    fn test_parse_escaped_metadata() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Insert xmlns:u="urn:av-openhome-org:service:Playlist:1">
      <Metadata>&lt;DIDL-Lite&gt;&lt;/DIDL-Lite&gt;</Metadata>
    </u:Insert>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(
            action.args.get("Metadata").map(String::as_str),
            Some("<DIDL-Lite></DIDL-Lite>")
        );
    }

    #[test]
    fn test_parse_action_no_args() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Stop xmlns:u="urn:schemas-upnp-org:service:AVTransport:1"/>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "Stop");
        assert!(action.args.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_envelope() {
        assert!(matches!(
            parse_soap_action(b"<Body/>"),
            Err(SoapParseError::MissingEnvelope)
        ));
        assert!(matches!(
            parse_soap_action(b"not xml"),
            Err(SoapParseError::XmlError(_))
        ));
    }
}
