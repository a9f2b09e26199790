use std::sync::Arc;

use futures::StreamExt;
use juniper::{DefaultScalarValue, ExecutionError, Value, Variables, graphql_value};

use crate::store::{Store, StoreConfig};
use super::{Context, root_node};


fn seeded_context() -> Context {
    Context::new(Arc::new(Store::from_config(&StoreConfig { seed_sample_data: true })))
}

async fn run(
    query: &str,
    context: &Context,
) -> (Value<DefaultScalarValue>, Vec<ExecutionError<DefaultScalarValue>>) {
    juniper::execute(query, None, &root_node(), &Variables::new(), context)
        .await
        .unwrap_or_else(|e| panic!("failed to execute '{query}': {e:?}"))
}

async fn run_ok(query: &str, context: &Context) -> Value<DefaultScalarValue> {
    let (value, errors) = run(query, context).await;
    assert!(errors.is_empty(), "unexpected errors for '{query}': {errors:#?}");
    value
}

fn error_kind(error: &ExecutionError<DefaultScalarValue>) -> Option<&str> {
    error.error().extensions()
        .as_object_value()?
        .get_field_value("kind")?
        .as_string_value()
}


#[tokio::test]
async fn hello() {
    let ctx = seeded_context();
    assert_eq!(
        run_ok("{ hello }", &ctx).await,
        graphql_value!({ "hello": "Hello world!" }),
    );
}

#[tokio::test]
async fn nested_relations() {
    let ctx = seeded_context();
    let value = run_ok(
        "{ allBooks { id title releaseDate authors { id name books { title } } } }",
        &ctx,
    ).await;

    assert_eq!(value, graphql_value!({
        "allBooks": [{
            "id": "1",
            "title": "book's title",
            "releaseDate": null,
            "authors": [{
                "id": "1",
                "name": "author's name",
                "books": [{ "title": "book's title" }],
            }],
        }],
    }));
}

#[tokio::test]
async fn create_book_and_author() {
    let ctx = seeded_context();
    let value = run_ok(
        r#"mutation {
            createAuthor(input: { name: "Ursula", bookIds: [1] }) { id name books { id } }
        }"#,
        &ctx,
    ).await;
    assert_eq!(value, graphql_value!({
        "createAuthor": { "id": "2", "name": "Ursula", "books": [{ "id": "1" }] },
    }));

    let value = run_ok(
        r#"mutation {
            createBook(input: { title: "Earthsea", authorIds: [2, 2, 9], releaseDate: "1968" }) {
                id title releaseDate authors { name }
            }
        }"#,
        &ctx,
    ).await;
    assert_eq!(value, graphql_value!({
        "createBook": {
            "id": "2",
            "title": "Earthsea",
            "releaseDate": "1968",
            "authors": [{ "name": "Ursula" }],
        },
    }));

    let value = run_ok("{ allAuthors { name books { title } } }", &ctx).await;
    assert_eq!(value, graphql_value!({
        "allAuthors": [
            { "name": "author's name", "books": [{ "title": "book's title" }] },
            { "name": "Ursula", "books": [{ "title": "book's title" }, { "title": "Earthsea" }] },
        ],
    }));
}

#[tokio::test]
async fn book_by_id() {
    let ctx = seeded_context();
    assert_eq!(
        run_ok("{ a: bookById(id: 1) { title } b: bookById(id: 5) { title } c: bookById { title } }", &ctx).await,
        graphql_value!({
            "a": { "title": "book's title" },
            "b": null,
            "c": null,
        }),
    );
}

#[tokio::test]
async fn update_and_delete_book() {
    let ctx = seeded_context();
    let value = run_ok(
        r#"mutation { updateBook(id: "1", input: { title: "B" }) { id title authors { id } } }"#,
        &ctx,
    ).await;
    assert_eq!(value, graphql_value!({
        "updateBook": { "id": "1", "title": "B", "authors": [{ "id": "1" }] },
    }));

    let value = run_ok(r#"mutation { deleteBook(id: "1") { title } }"#, &ctx).await;
    assert_eq!(value, graphql_value!({ "deleteBook": { "title": "B" } }));

    let value = run_ok("{ allBooks { id } allAuthors { books { id } } }", &ctx).await;
    assert_eq!(value, graphql_value!({
        "allBooks": [],
        "allAuthors": [{ "books": [] }],
    }));
}

#[tokio::test]
async fn missing_book_is_not_found() {
    let ctx = seeded_context();
    for query in [
        r#"mutation { updateBook(id: "42", input: { title: "X" }) { id } }"#,
        r#"mutation { updateBook(id: "nope", input: { title: "X" }) { id } }"#,
        r#"mutation { deleteBook(id: "42") { id } }"#,
    ] {
        let (value, errors) = run(query, &ctx).await;
        assert_eq!(value, Value::null(), "{query}");
        assert_eq!(errors.len(), 1, "{query}");
        assert_eq!(error_kind(&errors[0]), Some("NOT_FOUND"), "{query}");
        assert!(errors[0].error().message().starts_with("Not found:"));
    }

    let (_, errors) = run(r#"mutation { deleteBook(id: "42") { id } }"#, &ctx).await;
    assert_eq!(errors[0].error().message(), "Not found: no book with ID '42'");

    // The store is left untouched.
    let value = run_ok("{ allBooks { title } }", &ctx).await;
    assert_eq!(value, graphql_value!({ "allBooks": [{ "title": "book's title" }] }));
}

#[tokio::test]
async fn ids_in_float_notation() {
    let ctx = seeded_context();
    let value = run_ok(
        r#"mutation { updateBook(id: " 1.0 ", input: { title: "B" }) { id title } }"#,
        &ctx,
    ).await;
    assert_eq!(value, graphql_value!({ "updateBook": { "id": "1", "title": "B" } }));
}

#[tokio::test]
async fn update_author_is_not_implemented() {
    let ctx = seeded_context();
    let (value, errors) = run(
        r#"mutation { updateAuthor(id: "1", input: { name: "X" }) { id } }"#,
        &ctx,
    ).await;

    assert_eq!(value, Value::null());
    assert_eq!(errors.len(), 1);
    assert_eq!(error_kind(&errors[0]), Some("NOT_IMPLEMENTED"));
    assert_eq!(
        errors[0].error().message(),
        "Not implemented: updating authors is not supported (author '1')",
    );
    assert_eq!(ctx.store.authors()[0].name, "author's name");
}

#[tokio::test]
async fn book_created_subscription() {
    let ctx = seeded_context();
    let root = root_node();
    let (value, errors) = juniper::resolve_into_stream(
        "subscription { bookCreated { title authors { name } } }",
        None,
        &root,
        &Variables::new(),
        &ctx,
    ).await.expect("failed to start subscription");
    assert!(errors.is_empty());

    let (name, stream) = value.into_object()
        .expect("subscription result is not an object")
        .into_iter()
        .next()
        .expect("subscription result is empty");
    assert_eq!(name, "bookCreated");
    let mut stream = match stream {
        Value::Scalar(stream) => stream,
        _ => panic!("subscription field is not a stream"),
    };

    run_ok(r#"mutation { createBook(input: { title: "fresh", authorIds: [1] }) { id } }"#, &ctx)
        .await;

    let item = stream.next().await
        .expect("subscription stream ended")
        .expect("subscription stream returned error");
    assert_eq!(item, graphql_value!({
        "title": "fresh",
        "authors": [{ "name": "author's name" }],
    }));
}

#[test]
fn schema_contains_all_fields() {
    let sdl = root_node().as_sdl();
    for field in [
        "hello: String!",
        "allBooks: [Book!]!",
        "allAuthors: [Author!]!",
        "bookById(id: Int): Book",
        "createBook(input: CreateBookInput!): Book!",
        "updateBook(id: ID!, input: CreateBookInput!): Book!",
        "deleteBook(id: ID!): Book!",
        "createAuthor(input: CreateAuthorInput!): Author!",
        "updateAuthor(id: ID!, input: CreateAuthorInput!): Author!",
        "bookCreated: Book!",
        "releaseDate: String",
        "authorIds: [Int!]",
        "bookIds: [Int!]",
    ] {
        assert!(sdl.contains(field), "schema is missing '{field}':\n{sdl}");
    }
}
