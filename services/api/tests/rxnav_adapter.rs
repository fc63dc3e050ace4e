use api_lib::adapters::RxNavAdapter;
use medimate_core::ports::{PortError, TerminologyService};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> RxNavAdapter {
    RxNavAdapter::new(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn finds_rxcuis_for_a_brand_name() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui.json"))
        .and(query_param("name", "Advil"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idGroup": { "name": "Advil", "rxnormId": ["153010", "202488"] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ids = adapter(&mock_server).find_rxcuis("Advil").await.unwrap();

    assert_eq!(ids, vec!["153010".to_string(), "202488".to_string()]);
}

#[tokio::test]
async fn missing_identifier_list_means_no_match() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idGroup": { "name": "zzzz" }
        })))
        .mount(&mock_server)
        .await;

    let ids = adapter(&mock_server).find_rxcuis("zzzz").await.unwrap();

    assert!(ids.is_empty());
}

#[tokio::test]
async fn returns_names_from_the_first_concept_group_only() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui/153010/related.json"))
        .and(query_param("rela", "tradename_of"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "relatedGroup": {
                "rxcui": "153010",
                "conceptGroup": [
                    {
                        "tty": "IN",
                        "conceptProperties": [
                            { "rxcui": "5640", "name": "ibuprofen" },
                            { "rxcui": "5641", "name": "ibuprofen lysine" }
                        ]
                    },
                    {
                        "tty": "PIN",
                        "conceptProperties": [{ "rxcui": "9999", "name": "other" }]
                    }
                ]
            }
        })))
        .mount(&mock_server)
        .await;

    let names = adapter(&mock_server)
        .find_trade_name_of("153010")
        .await
        .unwrap();

    assert_eq!(names, vec!["ibuprofen".to_string(), "ibuprofen lysine".to_string()]);
}

#[tokio::test]
async fn related_group_without_concepts_yields_no_names() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui/42/related.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "relatedGroup": { "rxcui": "42", "conceptGroup": [{ "tty": "IN" }] }
        })))
        .mount(&mock_server)
        .await;

    let names = adapter(&mock_server).find_trade_name_of("42").await.unwrap();

    assert!(names.is_empty());
}

#[tokio::test]
async fn server_errors_surface_as_unexpected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result = adapter(&mock_server).find_rxcuis("Advil").await;

    assert!(matches!(result, Err(PortError::Unexpected(_))));
}

#[tokio::test]
async fn malformed_bodies_surface_as_unexpected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rxcui/1/related.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let result = adapter(&mock_server).find_trade_name_of("1").await;

    assert!(matches!(result, Err(PortError::Unexpected(_))));
}
