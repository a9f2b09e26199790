use juniper::graphql_object;

use crate::store::{Author, Book};
use super::Context;


/// The root query object.
pub(crate) struct Query;

#[graphql_object(Context = Context)]
impl Query {
    /// Always returns "Hello world!". Useful to check whether the API is up.
    fn hello() -> &'static str {
        "Hello world!"
    }

    /// Returns all books, in insertion order. Replaced books come last.
    fn all_books(context: &Context) -> Vec<Book> {
        Book::load_all(context)
    }

    /// Returns all authors, in insertion order.
    fn all_authors(context: &Context) -> Vec<Author> {
        Author::load_all(context)
    }

    /// Returns the book with the given ID or `null` if it does not exist or
    /// no ID was given.
    fn book_by_id(id: Option<i32>, context: &Context) -> Option<Book> {
        id.and_then(|id| Book::load_by_id(id, context))
    }
}
