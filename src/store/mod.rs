//! The in-memory entity store: books, authors and the links between them.
//!
//! All data lives in three plain collections guarded by a single mutex. The
//! lock is held for the whole duration of each store operation and never
//! across an `.await`. Nothing is persisted: everything is gone when the
//! process exits.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    events::EventBus,
    prelude::*,
};

mod mutations;
mod relations;

#[cfg(test)]
mod tests;

pub(crate) use self::mutations::{NewAuthor, NewBook};


/// Configuration of the in-memory store.
#[derive(Debug, confique::Config)]
pub(crate) struct StoreConfig {
    /// Whether to start with one sample book, one sample author and a link
    /// between the two. Otherwise the store starts out empty.
    #[config(default = true)]
    pub(crate) seed_sample_data: bool,
}


macro_rules! define_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub(crate) struct $name(pub(crate) i32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(
    /// Identifies a book. Never reused, even after the book is deleted.
    BookId
);
define_id!(
    /// Identifies an author. Never reused.
    AuthorId
);


#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Book {
    pub(crate) id: BookId,
    pub(crate) title: String,
    /// Free-form, not parsed in any way.
    pub(crate) release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Author {
    pub(crate) id: AuthorId,
    pub(crate) name: String,
}

/// One row of the many-to-many join table. Duplicates are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BookAuthorLink {
    pub(crate) book_id: BookId,
    pub(crate) author_id: AuthorId,
}


/// The actual collections.
#[derive(Debug, Default)]
struct Tables {
    books: Vec<Book>,
    authors: Vec<Author>,
    links: Vec<BookAuthorLink>,

    next_book_id: i32,
    next_author_id: i32,
}

impl Tables {
    fn new() -> Self {
        Self {
            next_book_id: 1,
            next_author_id: 1,
            ..Self::default()
        }
    }

    fn alloc_book_id(&mut self) -> BookId {
        let id = BookId(self.next_book_id);
        self.next_book_id += 1;
        id
    }

    fn alloc_author_id(&mut self) -> AuthorId {
        let id = AuthorId(self.next_author_id);
        self.next_author_id += 1;
        id
    }
}


/// Owner of all books, authors and links.
///
/// Reads hand out copies, writes only happen through the methods in the
/// `mutations` submodule. Book creation is announced on the event bus
/// returned by [`Store::events`].
pub(crate) struct Store {
    tables: Mutex<Tables>,
    events: EventBus<Book>,
}

impl Store {
    /// Creates an empty store.
    pub(crate) fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::new()),
            events: EventBus::new(),
        }
    }

    /// Creates a store according to the configuration.
    pub(crate) fn from_config(config: &StoreConfig) -> Self {
        let store = Self::new();
        if config.seed_sample_data {
            store.seed();
        }
        store
    }

    /// Inserts the sample book and author, linked with each other. Does not
    /// emit any events.
    fn seed(&self) {
        let mut tables = self.lock();
        let book_id = tables.alloc_book_id();
        let author_id = tables.alloc_author_id();
        tables.books.push(Book {
            id: book_id,
            title: "book's title".into(),
            release_date: None,
        });
        tables.authors.push(Author {
            id: author_id,
            name: "author's name".into(),
        });
        tables.links.push(BookAuthorLink { book_id, author_id });
        debug!("Seeded store with sample book {book_id} and sample author {author_id}");
    }

    /// The bus on which newly created books are published.
    pub(crate) fn events(&self) -> &EventBus<Book> {
        &self.events
    }

    /// All books in insertion order. Updated books move to the end.
    pub(crate) fn books(&self) -> Vec<Book> {
        self.lock().books.clone()
    }

    /// All authors in insertion order.
    pub(crate) fn authors(&self) -> Vec<Author> {
        self.lock().authors.clone()
    }

    pub(crate) fn book(&self, id: BookId) -> Option<Book> {
        self.lock().books.iter().find(|b| b.id == id).cloned()
    }

    /// The collections only ever hold plain data and every operation leaves
    /// them consistent before it can panic, so a poisoned lock is still fine
    /// to use.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
