//! SOAP Faults pour UPnP

use super::builder::{SOAP_ENVELOPE_NS, element_to_string};
use xmltree::{Element, XMLNode};

const UPNP_CONTROL_NS: &str = "urn:schemas-upnp-org:control-1-0";

fn text_element(name: &str, text: impl Into<String>) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.into()));
    elem
}

/// Construit un SOAP Fault XML
///
/// # Arguments
///
/// * `fault_code` - Code du fault (ex: "s:Client")
/// * `fault_string` - Message d'erreur
/// * `upnp_error_code` - Code d'erreur UPnP optionnel (ex: "800")
/// * `upnp_error_desc` - Description d'erreur UPnP optionnelle
pub fn build_soap_fault(
    fault_code: &str,
    fault_string: &str,
    upnp_error_code: Option<&str>,
    upnp_error_desc: Option<&str>,
) -> Result<String, xmltree::Error> {
    let mut fault = Element::new("s:Fault");
    fault
        .children
        .push(XMLNode::Element(text_element("faultcode", fault_code)));
    fault
        .children
        .push(XMLNode::Element(text_element("faultstring", fault_string)));

    if let (Some(code), Some(desc)) = (upnp_error_code, upnp_error_desc) {
        let mut upnp_error = Element::new("UPnPError");
        upnp_error
            .attributes
            .insert("xmlns".to_string(), UPNP_CONTROL_NS.to_string());
        upnp_error
            .children
            .push(XMLNode::Element(text_element("errorCode", code)));
        upnp_error
            .children
            .push(XMLNode::Element(text_element("errorDescription", desc)));

        let mut detail = Element::new("detail");
        detail.children.push(XMLNode::Element(upnp_error));
        fault.children.push(XMLNode::Element(detail));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(fault));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope.children.push(XMLNode::Element(body));

    element_to_string(&envelope, true)
}

/// Fault UPnP standard : `s:Client` / `UPnPError` avec code et description
pub fn build_upnp_fault(code: u16, description: &str) -> Result<String, xmltree::Error> {
    build_soap_fault(
        "s:Client",
        "UPnPError",
        Some(&code.to_string()),
        Some(description),
    )
}
