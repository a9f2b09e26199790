use juniper::{GraphQLInputObject, ID, graphql_object};

use crate::{
    api::{
        Context,
        err::{ApiResult, not_implemented},
    },
    prelude::*,
    store::{Author, Book, BookId, NewAuthor},
};


/// An author writes books.
#[graphql_object(Context = Context)]
impl Author {
    fn id(&self) -> ID {
        ID::new(self.id.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// All books this author has written. Empty if there are none.
    fn books(&self, context: &Context) -> Vec<Book> {
        context.store.books_of(self.id)
    }
}

#[derive(Debug, GraphQLInputObject)]
pub(crate) struct CreateAuthorInput {
    name: String,
    book_ids: Option<Vec<i32>>,
}

impl From<CreateAuthorInput> for NewAuthor {
    fn from(input: CreateAuthorInput) -> Self {
        Self {
            name: input.name,
            book_ids: input.book_ids.map(|ids| ids.into_iter().map(BookId).collect()),
        }
    }
}

impl Author {
    pub(crate) fn load_all(context: &Context) -> Vec<Self> {
        context.store.authors()
    }

    pub(crate) fn create(input: CreateAuthorInput, context: &Context) -> Self {
        context.store.create_author(input.into())
    }

    /// Authors cannot be changed once created. The field only exists so that
    /// clients get an explicit error instead of `null`.
    pub(crate) fn update(id: ID, input: CreateAuthorInput) -> ApiResult<Self> {
        debug!(id = &*id, ?input, "Rejected attempt to update an author");
        Err(not_implemented!(
            key = "author.update-not-supported",
            "updating authors is not supported (author '{}')",
            &*id,
        ))
    }
}
