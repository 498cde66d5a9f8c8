use crate::domain::{format_size, Network};
use crate::error::{ApiError, ErrorCode};
use crate::protocol::{DocumentDetail, DocumentListResponse, LoginResponse, NonceResponse};

#[test]
fn network_parses_case_insensitively() {
    assert_eq!("public".parse::<Network>().unwrap(), Network::Public);
    assert_eq!("Private".parse::<Network>().unwrap(), Network::Private);
    assert!("mainnet".parse::<Network>().is_err());
}

#[test]
fn network_round_trips_through_display() {
    for network in [Network::Public, Network::Private] {
        assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
    }
}

#[test]
fn format_size_picks_sensible_units() {
    assert_eq!(format_size(0), "0 B");
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(2048), "2.00 KB");
    assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
}

#[test]
fn listing_envelope_matches_backend_shape() {
    let raw = r#"{
        "data": {
            "files": [{
                "id": "doc-1",
                "name": "contract.pdf",
                "cid": "bafy123",
                "size": 2048,
                "number_of_files": 1,
                "mime_type": "application/pdf",
                "group_id": null,
                "keyvalues": {"instansi": "Registry Office"},
                "created_at": "2024-08-15T10:00:00Z"
            }],
            "next_page_token": null
        }
    }"#;
    let parsed: DocumentListResponse = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.data.files.len(), 1);
    let file = &parsed.data.files[0];
    assert_eq!(file.name, "contract.pdf");
    assert_eq!(file.keyvalues["instansi"], "Registry Office");
    assert!(parsed.data.next_page_token.is_none());
}

#[test]
fn detail_uses_camel_case_field_names() {
    let raw = r#"{
        "id": "doc-1",
        "name": "contract.pdf",
        "cid": "bafy123",
        "size": 2048,
        "issuer": "0xabc",
        "createdAt": "2024-08-15T10:00:00Z",
        "isValid": true,
        "isExistEthereum": true,
        "isExistBase": false
    }"#;
    let detail: DocumentDetail = serde_json::from_str(raw).unwrap();
    assert!(detail.is_valid);
    assert!(detail.is_exist_ethereum);
    assert!(!detail.is_exist_base);
}

#[test]
fn auth_payloads_use_camel_case() {
    let nonce: NonceResponse =
        serde_json::from_str(r#"{"messageString": "sign me"}"#).unwrap();
    assert_eq!(nonce.message_string, "sign me");

    let login: LoginResponse =
        serde_json::from_str(r#"{"accessToken": "jwt-token"}"#).unwrap();
    assert_eq!(login.access_token, "jwt-token");
}

#[test]
fn api_error_tolerates_missing_fields() {
    let err: ApiError = serde_json::from_str("{}").unwrap();
    assert!(err.code.is_none());
    assert!(err.message.is_none());

    let err: ApiError =
        serde_json::from_str(r#"{"code": "not_found", "message": "no such document"}"#).unwrap();
    assert_eq!(err.code, Some(ErrorCode::NotFound));
    assert_eq!(err.message.as_deref(), Some("no such document"));
}
