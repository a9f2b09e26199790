use std::collections::HashSet;

use super::{Author, AuthorId, Book, BookId, Store};


impl Store {
    /// Returns all authors linked to the given book, in the order of the
    /// author collection. Each author appears at most once, even if there are
    /// duplicate links. Dangling links are ignored.
    pub(crate) fn authors_of(&self, book: BookId) -> Vec<Author> {
        let tables = self.lock();
        let ids = tables.links.iter()
            .filter(|link| link.book_id == book)
            .map(|link| link.author_id)
            .collect::<HashSet<AuthorId>>();

        tables.authors.iter()
            .filter(|author| ids.contains(&author.id))
            .cloned()
            .collect()
    }

    /// Returns all books linked to the given author, in the order of the book
    /// collection. The inverse of [`Store::authors_of`].
    pub(crate) fn books_of(&self, author: AuthorId) -> Vec<Book> {
        let tables = self.lock();
        let ids = tables.links.iter()
            .filter(|link| link.author_id == author)
            .map(|link| link.book_id)
            .collect::<HashSet<BookId>>();

        tables.books.iter()
            .filter(|book| ids.contains(&book.id))
            .cloned()
            .collect()
    }
}
