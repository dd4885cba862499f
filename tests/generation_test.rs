use openapi_from_rules::{
    collaborators::Collaborators,
    manifest::Manifest,
    openapi_builder::{assemble_with_info, OpenApiDocument},
    serializer::{serialize, write_to_file, OutputFormat},
    source::SourceIndex,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/shop")
        .join(path)
}

fn generate() -> OpenApiDocument {
    let manifest = Manifest::from_path(&fixture("openapi-app.yaml")).expect("Failed to load manifest");
    let index = SourceIndex::scan(&fixture("src"), manifest.conventions()).expect("Failed to index sources");
    let collaborators = Collaborators::new(&manifest, &index);
    assemble_with_info(&collaborators, manifest.info().clone()).expect("Failed to generate document")
}

fn generate_json() -> Value {
    let content = serialize(&generate(), OutputFormat::Json).expect("Failed to serialize");
    serde_json::from_str(&content).expect("Generated JSON should parse")
}

#[test]
fn test_document_header_and_tags() {
    let doc = generate_json();

    assert_eq!(doc["openapi"], "3.0.2");
    assert_eq!(
        doc["info"],
        json!({"title": "Shop API", "version": "1.0", "description": "Storefront backend"})
    );
    assert_eq!(
        doc["tags"],
        json!([
            {"name": "User", "description": "All user related endpoints"},
            {"name": "Status", "description": "All status related endpoints"}
        ])
    );
}

#[test]
fn test_paths_are_merged_and_closures_skipped() {
    let doc = generate();

    let paths: Vec<&str> = doc.paths.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["/users", "/users/{user}", "/status"]);

    let users = &doc.paths["/users"];
    assert!(users.get.is_some());
    assert!(users.head.is_some());
    assert!(users.post.is_some());

    let user = &doc.paths["/users/{user}"];
    assert!(user.get.is_some());
    assert!(user.delete.is_some());
}

#[test]
fn test_request_body_from_rules() {
    let doc = generate_json();
    let store = &doc["paths"]["/users"]["post"];

    assert_eq!(store["operationId"], "users.store.POST");
    assert_eq!(store["summary"], "Create a user.");
    assert_eq!(store["requestBody"]["required"], true);

    let schema = &store["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["email", "name"]));

    let email = &schema["properties"]["email"];
    assert_eq!(email["type"], "string");
    assert_eq!(email["format"], "email");
    assert_eq!(email["example"], "user@example.com");
    assert_eq!(
        email["description"],
        "Tell us where to write to. The email must be a valid email address."
    );

    assert_eq!(schema["properties"]["name"]["maxLength"], 50);
    assert_eq!(schema["properties"]["tags"]["type"], "array");
    assert_eq!(schema["properties"]["tags"]["items"]["enum"], json!(["new", "vip"]));
    assert_eq!(schema["properties"]["tags"]["items"]["example"], "new");
    assert_eq!(schema["properties"]["address"]["type"], "object");
    assert_eq!(schema["properties"]["address"]["properties"]["city"]["type"], "string");
}

#[test]
fn test_query_and_path_parameters() {
    let doc = generate_json();

    let index = &doc["paths"]["/users"]["get"];
    assert_eq!(index["summary"], "List users.");
    assert_eq!(index["description"], "Every registered user, newest first.");
    assert!(index.get("requestBody").is_none());

    let parameters = index["parameters"].as_array().unwrap();
    let names: Vec<&str> = parameters.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["filter[name]", "page"]);
    assert!(parameters.iter().all(|p| p["in"] == "query" && p["required"] == false));
    assert_eq!(parameters[1]["schema"]["type"], "integer");
    assert_eq!(parameters[1]["schema"]["minimum"], 1);
    assert_eq!(parameters[1]["example"], 1);

    let show = &doc["paths"]["/users/{user}"]["get"];
    assert_eq!(
        show["parameters"],
        json!([{"name": "user", "in": "path", "required": true, "schema": {"type": "string"}}])
    );
}

#[test]
fn test_collection_items_match_single_resource() {
    let doc = generate_json();

    let collection = &doc["paths"]["/users"]["get"]["responses"]["200"];
    let collection_schema = &collection["content"]["application/json"]["schema"];
    assert_eq!(collection_schema["type"], "array");

    let single = &doc["paths"]["/users"]["post"]["responses"]["200"];
    assert_eq!(single["description"], "A registered user.");
    let single_schema = &single["content"]["application/json"]["schema"];

    assert_eq!(&collection_schema["items"], single_schema);
    assert_eq!(
        single_schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .collect::<Vec<_>>(),
        vec!["id", "name", "email"]
    );
    assert_eq!(single_schema["properties"]["id"]["type"], "integer");
}

#[test]
fn test_head_responses_have_no_body() {
    let doc = generate_json();
    let head = &doc["paths"]["/users"]["head"];

    assert_eq!(head["operationId"], "users.index.HEAD");
    assert!(head["responses"]["200"].get("content").is_none());
}

#[test]
fn test_declared_errors() {
    let doc = generate_json();

    let not_found = &doc["paths"]["/users/{user}"]["get"]["responses"]["404"];
    assert_eq!(not_found["description"], "The requested record does not exist.");
    let body = &not_found["content"]["application/json"]["schema"];
    assert_eq!(body["properties"]["message"]["example"], "The requested record does not exist.");

    let store = &doc["paths"]["/users"]["post"]["responses"];
    let statuses: Vec<&String> = store.as_object().unwrap().keys().collect();
    assert_eq!(statuses, vec!["200", "403"]);
    assert_eq!(store["403"]["description"], "This action is unauthorized.");
}

#[test]
fn test_redirect_and_raw_responses() {
    let doc = generate_json();

    let destroy = &doc["paths"]["/users/{user}"]["delete"];
    assert_eq!(destroy["operationId"], "UserController.destroy.DELETE");
    assert_eq!(destroy["responses"], json!({"302": {"description": "Redirect"}}));

    let status = &doc["paths"]["/status"]["get"]["responses"]["200"];
    assert_eq!(status["description"], "Service health.");
    let schema = &status["content"]["application/json"]["schema"];
    assert_eq!(schema["properties"]["healthy"]["type"], "boolean");
    assert_eq!(schema["properties"]["version"]["example"], "1.4.0");
}

#[test]
fn test_yaml_output_written_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("docs/openapi.yaml");

    let yaml = serialize(&generate(), OutputFormat::Yaml).unwrap();
    write_to_file(&yaml, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: Value = serde_yaml::from_str(&written).unwrap();
    assert_eq!(parsed["info"]["title"], "Shop API");
    assert!(written.contains("operationId: users.show.GET"));
}
