//! # Routes HTTP UPnP : contrôle SOAP et abonnements GENA
//!
//! Pour chaque service enregistré :
//!
//! - `POST /{service}/control` : invocation d'une action SOAP
//! - `SUBSCRIBE|UNSUBSCRIBE /{service}/event` : abonnements aux évènements
//!
//! L'identité de l'appelant ([`CallerIdentity`]) est construite à partir de
//! l'adresse de la socket et de l'en-tête `User-Agent`. Le routeur doit donc
//! être servi avec `into_make_service_with_connect_info::<SocketAddr>()`.

use crate::actions::{ActionArgs, ActionFault, CallerIdentity};
use crate::events::{EventError, Subscriber, UpnpEventManager, parse_timeout};
use crate::services::UpnpService;
use crate::soap::{build_soap_response, build_upnp_fault, error_codes, parse_soap_action};
use axum::{
    Router,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, post},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const METHOD_SUBSCRIBE: &str = "SUBSCRIBE";
pub const METHOD_UNSUBSCRIBE: &str = "UNSUBSCRIBE";

const CONTENT_TYPE_XML: &str = r#"text/xml; charset="utf-8""#;
const FALLBACK_FAULT: &str = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Server</faultcode><faultstring>Internal Error</faultstring></s:Fault></s:Body></s:Envelope>"#;

/// État partagé des routes UPnP
pub struct UpnpServerState {
    services: HashMap<&'static str, Arc<dyn UpnpService>>,
    events: Arc<UpnpEventManager>,
}

impl UpnpServerState {
    pub fn new(services: Vec<Arc<dyn UpnpService>>, events: Arc<UpnpEventManager>) -> Self {
        let services = services.into_iter().map(|s| (s.name(), s)).collect();
        Self { services, events }
    }

    pub fn service(&self, name: &str) -> Option<&Arc<dyn UpnpService>> {
        self.services.get(name)
    }
}

/// Routeur axum des services UPnP
pub fn upnp_router(services: Vec<Arc<dyn UpnpService>>, events: Arc<UpnpEventManager>) -> Router {
    let state = Arc::new(UpnpServerState::new(services, events));
    for name in state.services.keys() {
        info!("✅ UPnP service routes: /{0}/control, /{0}/event", name);
    }

    Router::new()
        .route("/{service}/control", post(control_handler))
        .route("/{service}/event", any(event_handler))
        .with_state(state)
}

fn caller_identity(addr: &SocketAddr, headers: &HeaderMap) -> CallerIdentity {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    CallerIdentity::new(addr.ip().to_string(), user_agent)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE_XML)], body).into_response()
}

fn fault_response(fault: &ActionFault) -> Response {
    let body = build_upnp_fault(fault.code, &fault.description).unwrap_or_else(|e| {
        error!("❌ Unable to build SOAP fault: {}", e);
        FALLBACK_FAULT.to_string()
    });
    xml_response(StatusCode::INTERNAL_SERVER_ERROR, body)
}

/// Handler Axum pour le contrôle SOAP
///
/// Les faults retournés par les actions, une action inconnue (401) ou une
/// requête illisible deviennent des SOAP Faults avec le statut HTTP 500.
pub async fn control_handler(
    State(state): State<Arc<UpnpServerState>>,
    Path(service_name): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(service) = state.service(&service_name) else {
        warn!("Control request for unknown service {}", service_name);
        return StatusCode::NOT_FOUND.into_response();
    };

    let soap_action = match parse_soap_action(body.as_bytes()) {
        Ok(action) => action,
        Err(e) => {
            error!("❌ Failed to parse SOAP: {}", e);
            return fault_response(&ActionFault::new(
                error_codes::INVALID_ACTION,
                "The SOAP request could not be parsed",
            ));
        }
    };

    let caller = caller_identity(&addr, &headers);
    let args = ActionArgs::from(soap_action.args);
    debug!("🎬 {} action {} from {}", service_name, soap_action.name, caller.key());

    match service.handle_action(&soap_action.name, &args, &caller) {
        Some(Ok(response)) => {
            match build_soap_response(
                service.service_type(),
                &soap_action.name,
                response.into_values(),
            ) {
                Ok(xml) => xml_response(StatusCode::OK, xml),
                Err(e) => {
                    error!("❌ Failed to build SOAP response: {}", e);
                    fault_response(&ActionFault::action_failed("unable to build response"))
                }
            }
        }
        Some(Err(fault)) => {
            warn!("{} {} failed: {}", service_name, soap_action.name, fault);
            fault_response(&fault)
        }
        None => {
            warn!("Unhandled action {} on {}", soap_action.name, service_name);
            fault_response(&ActionFault::invalid_action())
        }
    }
}

fn subscription_response(subscriber: &Subscriber) -> Response {
    match (
        HeaderValue::from_str(&subscriber.sid),
        HeaderValue::from_str(&subscriber.timeout_header()),
    ) {
        (Ok(sid), Ok(timeout)) => (
            StatusCode::OK,
            [
                (HeaderName::from_static("sid"), sid),
                (HeaderName::from_static("timeout"), timeout),
            ],
        )
            .into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn event_error_response(err: &EventError) -> Response {
    warn!("Event subscription rejected: {}", err);
    match err {
        EventError::UnknownTopic(_) => StatusCode::NOT_FOUND.into_response(),
        EventError::UnknownSid(_) | EventError::BadCallback(_) => {
            StatusCode::PRECONDITION_FAILED.into_response()
        }
    }
}

/// Handler Axum pour les évènements (SUBSCRIBE/UNSUBSCRIBE)
///
/// - `SUBSCRIBE` sans SID : nouvel abonnement (`CALLBACK` obligatoire)
/// - `SUBSCRIBE` avec SID : renouvellement
/// - `UNSUBSCRIBE` : annulation
pub async fn event_handler(
    State(state): State<Arc<UpnpServerState>>,
    Path(service_name): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let Some(service) = state.service(&service_name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    info!("📡 Event subscription request for {}", service_name);

    let sid = header_str(&headers, "SID");
    let timeout = parse_timeout(header_str(&headers, "TIMEOUT"));

    match method.as_str() {
        METHOD_SUBSCRIBE if sid.is_empty() => {
            let caller = caller_identity(&addr, &headers);
            let callback = header_str(&headers, "CALLBACK");
            match state
                .events
                .subscribe(service.name(), caller, callback, timeout)
            {
                Ok(subscriber) => subscription_response(&subscriber),
                Err(e) => event_error_response(&e),
            }
        }
        METHOD_SUBSCRIBE => match state.events.renew(sid, timeout) {
            Ok(subscriber) => subscription_response(&subscriber),
            Err(e) => event_error_response(&e),
        },
        METHOD_UNSUBSCRIBE => match state.events.unsubscribe(sid) {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => event_error_response(&e),
        },
        _ => {
            warn!("Unsupported EventSub method: {}", method);
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        }
    }
}
