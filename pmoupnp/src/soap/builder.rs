//! Construction de réponses SOAP

use xmltree::{Element, XMLNode};

pub(crate) const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Sérialise un élément XML, avec ou sans déclaration de document
pub(crate) fn element_to_string(
    element: &Element,
    document_declaration: bool,
) -> Result<String, xmltree::Error> {
    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(document_declaration)
        .perform_indent(true)
        .indent_string("  ");
    element.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Enveloppe `s:Envelope` contenant `body_child` dans son `s:Body`
pub(crate) fn soap_envelope(body_child: Element) -> Element {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope
        .attributes
        .insert("s:encodingStyle".to_string(), SOAP_ENCODING.to_string());
    envelope.children.push(XMLNode::Element(body));
    envelope
}

/// Construit une réponse SOAP UPnP
///
/// # Arguments
///
/// * `service_urn` - URN du service (ex: "urn:av-openhome-org:service:Playlist:1")
/// * `action` - Nom de l'action (ex: "IdArray")
/// * `values` - Valeurs de retour, dans l'ordre de l'action
///
/// Les valeurs sont échappées à la sérialisation : un document XML passé en
/// valeur (`TrackList`, métadonnées DIDL-Lite) arrive sous forme d'entités.
pub fn build_soap_response(
    service_urn: &str,
    action: &str,
    values: Vec<(String, String)>,
) -> Result<String, xmltree::Error> {
    let response_name = format!("u:{}Response", action);
    let mut response_elem = Element::new(&response_name);
    response_elem
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());

    for (key, value) in values {
        let mut child = Element::new(&key);
        child.children.push(XMLNode::Text(value));
        response_elem.children.push(XMLNode::Element(child));
    }

    element_to_string(&soap_envelope(response_elem), true)
}
