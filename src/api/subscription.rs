use std::pin::Pin;

use futures::{Stream, StreamExt};
use juniper::{FieldError, graphql_subscription};

use crate::{events::Topic, prelude::*, store::Book};
use super::Context;


type BookStream = Pin<Box<dyn Stream<Item = Result<Book, FieldError>> + Send>>;

/// The root subscription object.
pub(crate) struct Subscription;

#[graphql_subscription(Context = Context)]
impl Subscription {
    /// Emits every book created after the subscription has started.
    async fn book_created(context: &Context) -> BookStream {
        let events = context.store.events();
        let books = events.subscribe(Topic::BookCreated).map(Ok::<_, FieldError>);
        debug!(
            listeners = events.listener_count(Topic::BookCreated),
            "Started 'bookCreated' subscription",
        );
        Box::pin(books)
    }
}
