use juniper::{GraphQLInputObject, ID, graphql_object};

use crate::{
    api::{
        Context,
        err::{ApiResult, not_found},
    },
    store::{Author, AuthorId, Book, BookId, NewBook},
};
use super::parse_id;


/// A book has a title and authors.
#[graphql_object(Context = Context)]
impl Book {
    fn id(&self) -> ID {
        ID::new(self.id.to_string())
    }

    fn title(&self) -> &str {
        &self.title
    }

    /// All authors of this book. Empty if there are none.
    fn authors(&self, context: &Context) -> Vec<Author> {
        context.store.authors_of(self.id)
    }

    /// The release date of this book, in no particular format.
    fn release_date(&self) -> Option<&str> {
        self.release_date.as_deref()
    }
}

/// Data of a book to create, or to replace an existing book with.
#[derive(Debug, GraphQLInputObject)]
pub(crate) struct CreateBookInput {
    title: String,
    /// The authors of the book. When replacing a book, omitting this keeps
    /// the current authors.
    author_ids: Option<Vec<i32>>,
    release_date: Option<String>,
}

impl From<CreateBookInput> for NewBook {
    fn from(input: CreateBookInput) -> Self {
        Self {
            title: input.title,
            author_ids: input.author_ids.map(|ids| ids.into_iter().map(AuthorId).collect()),
            release_date: input.release_date,
        }
    }
}

impl Book {
    pub(crate) fn load_all(context: &Context) -> Vec<Self> {
        context.store.books()
    }

    pub(crate) fn load_by_id(id: i32, context: &Context) -> Option<Self> {
        context.store.book(BookId(id))
    }

    pub(crate) fn create(input: CreateBookInput, context: &Context) -> Self {
        context.store.create_book(input.into())
    }

    pub(crate) fn update(id: ID, input: CreateBookInput, context: &Context) -> ApiResult<Self> {
        parse_id(&id)
            .and_then(|key| context.store.update_book(BookId(key), input.into()))
            .ok_or_else(|| not_found!(key = "book.not-found", "no book with ID '{}'", &*id))
    }

    pub(crate) fn delete(id: ID, context: &Context) -> ApiResult<Self> {
        parse_id(&id)
            .and_then(|key| context.store.delete_book(BookId(key)))
            .ok_or_else(|| not_found!(key = "book.not-found", "no book with ID '{}'", &*id))
    }
}
