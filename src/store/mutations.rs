//! All write operations on the store.
//!
//! Updates are full replacements: the old row is removed and a new one with
//! the same ID is appended. Links are never patched either, but filtered and
//! rebuilt.

use crate::{events::Topic, prelude::*};
use super::{Author, AuthorId, Book, BookAuthorLink, BookId, Store};


/// Data for creating a book or replacing an existing one.
#[derive(Debug, Clone, Default)]
pub(crate) struct NewBook {
    pub(crate) title: String,
    /// `None` means "leave links alone" on update and "no links" on create.
    pub(crate) author_ids: Option<Vec<AuthorId>>,
    pub(crate) release_date: Option<String>,
}

/// Data for creating an author.
#[derive(Debug, Clone, Default)]
pub(crate) struct NewAuthor {
    pub(crate) name: String,
    pub(crate) book_ids: Option<Vec<BookId>>,
}


impl Store {
    /// Adds a new book with a fresh ID and links it to all given authors.
    /// Author IDs are not checked, so unknown ones end up as orphan links.
    ///
    /// The created book is published on [`Topic::BookCreated`] after the
    /// store lock has been released.
    pub(crate) fn create_book(&self, new: NewBook) -> Book {
        let book = {
            let mut tables = self.lock();
            let id = tables.alloc_book_id();
            let book = Book {
                id,
                title: new.title,
                release_date: new.release_date,
            };
            tables.books.push(book.clone());
            if let Some(author_ids) = new.author_ids {
                tables.links.extend(author_ids.into_iter().map(|author_id| BookAuthorLink {
                    book_id: id,
                    author_id,
                }));
            }
            book
        };

        debug!("Created book {} ('{}')", book.id, book.title);
        self.events.publish(Topic::BookCreated, book.clone());
        book
    }

    /// Replaces the book with the given ID. Returns `None` and leaves the
    /// store untouched if there is no such book.
    ///
    /// Fields not set in `new` are not carried over from the old row. If
    /// `new.author_ids` is set, all links of the book are replaced by the
    /// given ones; otherwise the existing links are kept.
    pub(crate) fn update_book(&self, id: BookId, new: NewBook) -> Option<Book> {
        let mut tables = self.lock();
        if !tables.books.iter().any(|b| b.id == id) {
            return None;
        }

        tables.books.retain(|b| b.id != id);
        let book = Book {
            id,
            title: new.title,
            release_date: new.release_date,
        };
        tables.books.push(book.clone());

        if let Some(author_ids) = new.author_ids {
            tables.links.retain(|link| link.book_id != id);
            tables.links.extend(author_ids.into_iter().map(|author_id| BookAuthorLink {
                book_id: id,
                author_id,
            }));
        }

        debug!("Updated book {id} ('{}')", book.title);
        Some(book)
    }

    /// Removes the book with the given ID together with all of its links and
    /// returns it. Returns `None` if there is no such book.
    pub(crate) fn delete_book(&self, id: BookId) -> Option<Book> {
        let mut tables = self.lock();
        let idx = tables.books.iter().position(|b| b.id == id)?;
        let book = tables.books.remove(idx);
        tables.links.retain(|link| link.book_id != id);

        debug!("Deleted book {id} ('{}')", book.title);
        Some(book)
    }

    /// Adds a new author with a fresh ID and links it to all given books. Book
    /// IDs are not checked.
    pub(crate) fn create_author(&self, new: NewAuthor) -> Author {
        let mut tables = self.lock();
        let id = tables.alloc_author_id();
        let author = Author { id, name: new.name };
        tables.authors.push(author.clone());
        if let Some(book_ids) = new.book_ids {
            tables.links.extend(book_ids.into_iter().map(|book_id| BookAuthorLink {
                book_id,
                author_id: id,
            }));
        }

        debug!("Created author {id} ('{}')", author.name);
        author
    }
}
