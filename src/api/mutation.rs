use juniper::{graphql_object, ID};

use crate::store::{Author, Book};
use super::{
    Context,
    err::ApiResult,
    model::{author::CreateAuthorInput, book::CreateBookInput},
};


/// The root mutation object.
pub(crate) struct Mutation;

#[graphql_object(Context = Context)]
impl Mutation {
    /// Creates a new book and notifies all `bookCreated` subscribers.
    ///
    /// Author IDs are not checked for existence.
    fn create_book(input: CreateBookInput, context: &Context) -> Book {
        Book::create(input, context)
    }

    /// Replaces the book with the given ID. This is not a patch: fields
    /// missing in `input` are cleared. Only `authorIds` is special: if it is
    /// omitted, the current authors are kept.
    fn update_book(id: ID, input: CreateBookInput, context: &Context) -> ApiResult<Book> {
        Book::update(id, input, context)
    }

    /// Deletes a book and all its author links. Returns the deleted book.
    fn delete_book(id: ID, context: &Context) -> ApiResult<Book> {
        Book::delete(id, context)
    }

    /// Creates a new author. Book IDs are not checked for existence.
    fn create_author(input: CreateAuthorInput, context: &Context) -> Author {
        Author::create(input, context)
    }

    /// Not supported: always returns an error.
    fn update_author(id: ID, input: CreateAuthorInput) -> ApiResult<Author> {
        Author::update(id, input)
    }
}
