// SPDX-License-Identifier: MIT

use super::*;
use crate::registration::EndpointRegistration;
use bytes::Bytes;

struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, subject: &str, payload: Bytes) -> HandlerReply {
        HandlerReply::Ok(Bytes::from(format!("{subject}:{}", String::from_utf8_lossy(&payload))))
    }
}

fn request(name: &str) -> ServiceRegistrationRequest {
    ServiceRegistrationRequest {
        name: name.to_string(),
        version: "1".to_string(),
        description: None,
        endpoints: vec![EndpointRegistration {
            subject: "host.g.hi".to_string(),
            metadata: IndexMap::new(),
        }],
    }
}

#[tokio::test]
async fn register_service_records_the_request() {
    let bus = FakeBus::new();
    bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap();
    assert_eq!(bus.registered_services(), vec!["G".to_string()]);
}

#[tokio::test]
async fn dispatch_routes_to_the_registered_handler() {
    let bus = FakeBus::new();
    bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap();
    let reply = bus.dispatch("G", "host.g.hi", Bytes::from_static(b"ping")).await.unwrap();
    match reply {
        HandlerReply::Ok(bytes) => assert_eq!(&bytes[..], b"host.g.hi:ping"),
        HandlerReply::Error { message } => panic!("unexpected error reply: {message}"),
    }
}

#[tokio::test]
async fn dispatch_returns_none_for_unknown_service() {
    let bus = FakeBus::new();
    assert!(bus.dispatch("nope", "x", Bytes::new()).await.is_none());
}

#[tokio::test]
async fn stop_removes_the_registration() {
    let bus = FakeBus::new();
    let registration = bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap();
    registration.stop().await.unwrap();
    assert!(bus.registered_services().is_empty());
}

#[tokio::test]
async fn total_registrations_counts_every_successful_register_call() {
    let bus = FakeBus::new();
    bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap();
    assert_eq!(bus.total_registrations(), 1);
    bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap();
    assert_eq!(bus.total_registrations(), 2);

    bus.fail_next_registration("simulated outage");
    assert!(bus.register_service(request("G"), Arc::new(EchoHandler)).await.is_err());
    assert_eq!(bus.total_registrations(), 2);
}

#[tokio::test]
async fn fail_next_registration_surfaces_the_configured_error() {
    let bus = FakeBus::new();
    bus.fail_next_registration("simulated outage");
    let err = bus.register_service(request("G"), Arc::new(EchoHandler)).await.unwrap_err();
    assert!(matches!(err, BusError::RegistrationFailed { reason } if reason == "simulated outage"));
}
