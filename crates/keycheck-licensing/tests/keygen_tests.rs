//! Keygen client tests against a mock licensing service.

use keycheck_core::{Error, LicenseService, ValidationCode};
use keycheck_licensing::{KeygenClient, KeygenConfig};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALIDATE_PATH: &str = "/v1/accounts/acme/licenses/actions/validate-key";

fn test_client(server: &MockServer) -> KeygenClient {
    KeygenClient::new(KeygenConfig {
        account_id: "acme".to_string(),
        api_url: server.uri(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn json_api(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("content-type", "application/vnd.api+json")
        .set_body_json(body)
}

#[tokio::test]
async fn validate_sends_key_and_fingerprint_scope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .and(header("content-type", "application/vnd.api+json"))
        .and(header("accept", "application/vnd.api+json"))
        .and(body_json(json!({
            "meta": { "key": "KEY-1234-ABCD", "scope": { "fingerprint": "fp-1" } }
        })))
        .respond_with(json_api(
            200,
            json!({
                "data": { "id": "lic-1", "type": "licenses", "attributes": { "status": "ACTIVE" } },
                "meta": { "valid": true, "detail": "is valid", "code": "VALID" }
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let validation = test_client(&server)
        .validate_license("KEY-1234-ABCD", "fp-1")
        .await
        .unwrap();

    let license = validation.license.unwrap();
    assert_eq!(license.id, "lic-1");
    assert_eq!(license.kind, "licenses");
    assert!(validation.result.valid);
    assert_eq!(validation.result.detail, "is valid");
    assert_eq!(validation.result.code, ValidationCode::Valid);
}

#[tokio::test]
async fn validate_reports_unregistered_machine() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(json_api(
            200,
            json!({
                "data": { "id": "lic-1", "type": "licenses" },
                "meta": {
                    "valid": false,
                    "detail": "fingerprint is not activated (has no associated machine)",
                    "code": "NO_MACHINE"
                }
            }),
        ))
        .mount(&server)
        .await;

    let validation = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap();

    assert!(!validation.result.valid);
    assert_eq!(validation.result.code, ValidationCode::NoMachine);
    assert!(validation.result.code.requires_activation());
}

#[tokio::test]
async fn validate_with_null_data_has_no_license() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(json_api(
            200,
            json!({
                "data": null,
                "meta": { "valid": false, "detail": "does not exist", "code": "NOT_FOUND" }
            }),
        ))
        .mount(&server)
        .await;

    let validation = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap();

    assert!(validation.license.is_none());
    assert_eq!(validation.result.code, ValidationCode::NotFound);
}

#[tokio::test]
async fn validate_error_list_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(json_api(
            404,
            json!({
                "errors": [
                    { "title": "Not found", "detail": "license key invalid", "code": "NOT_FOUND" },
                    { "title": "Second", "detail": "ignored" }
                ]
            }),
        ))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status,
            title,
            detail,
            code,
        } => {
            assert_eq!(status, 404);
            assert_eq!(title, "Not found");
            assert_eq!(detail.as_deref(), Some("license key invalid"));
            assert_eq!(code.as_deref(), Some("NOT_FOUND"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn validate_error_list_is_fatal_even_with_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(json_api(
            200,
            json!({ "errors": [{ "title": "Unauthorized", "code": "TOKEN_INVALID" }] }),
        ))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(200));
    assert_eq!(err.code(), Some("TOKEN_INVALID"));
}

#[tokio::test]
async fn validate_without_meta_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(json_api(200, json!({ "data": { "id": "lic-1", "type": "licenses" } })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn non_json_failure_uses_status_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .validate_license("KEY", "fp-1")
        .await
        .unwrap_err();

    match err {
        Error::Api { status, title, .. } => {
            assert_eq!(status, 502);
            assert_eq!(title, "Bad Gateway");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn activate_creates_machine_with_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts/acme/machines"))
        .and(header("authorization", "Bearer activ-tok"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(body_json(json!({
            "data": {
                "type": "machine",
                "attributes": { "fingerprint": "fp-1" },
                "relationships": {
                    "license": { "data": { "type": "license", "id": "lic-1" } }
                }
            }
        })))
        .respond_with(json_api(
            201,
            json!({
                "data": {
                    "id": "m-1",
                    "type": "machines",
                    "attributes": { "fingerprint": "fp-1" }
                }
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let machine = test_client(&server)
        .activate_device("lic-1", "fp-1", "activ-tok")
        .await
        .unwrap();

    assert_eq!(machine.id, "m-1");
    assert_eq!(machine.kind, "machines");
}

#[tokio::test]
async fn activate_error_list_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts/acme/machines"))
        .respond_with(json_api(
            422,
            json!({
                "errors": [{
                    "title": "Unprocessable resource",
                    "detail": "has already been taken",
                    "code": "FINGERPRINT_TAKEN"
                }]
            }),
        ))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .activate_device("lic-1", "fp-1", "activ-tok")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(err.code(), Some("FINGERPRINT_TAKEN"));
}

#[tokio::test]
async fn deactivate_succeeds_only_on_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/acme/machines/fp-1"))
        .and(header("authorization", "Bearer activ-tok"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)
        .deactivate_device("fp-1", "activ-tok")
        .await
        .unwrap();
}

#[tokio::test]
async fn deactivate_treats_ok_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/acme/machines/fp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .deactivate_device("fp-1", "activ-tok")
        .await
        .unwrap_err();

    match err {
        Error::Api { status, title, .. } => {
            assert_eq!(status, 200);
            assert_eq!(title, "OK");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn deactivate_reports_service_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/acme/machines/fp-1"))
        .respond_with(json_api(
            404,
            json!({
                "errors": [{
                    "title": "Not found",
                    "detail": "The requested machine 'fp-1' was not found",
                    "code": "NOT_FOUND"
                }]
            }),
        ))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .deactivate_device("fp-1", "activ-tok")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn client_is_usable_through_service_trait() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/acme/machines/fp-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service: Box<dyn LicenseService> = Box::new(test_client(&server));
    service.deactivate_device("fp-1", "activ-tok").await.unwrap();
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let client = KeygenClient::new(KeygenConfig {
        account_id: "acme".to_string(),
        api_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
    })
    .unwrap();

    let err = client.validate_license("KEY", "fp-1").await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}
