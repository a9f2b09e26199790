use futures::{FutureExt, StreamExt};

use crate::events::Topic;
use super::{AuthorId, BookId, NewAuthor, NewBook, Store, StoreConfig};


fn book(title: &str, authors: &[i32]) -> NewBook {
    NewBook {
        title: title.into(),
        author_ids: Some(authors.iter().copied().map(AuthorId).collect()),
        release_date: None,
    }
}

fn author(name: &str) -> NewAuthor {
    NewAuthor { name: name.into(), book_ids: None }
}

fn titles(store: &Store) -> Vec<String> {
    store.books().into_iter().map(|b| b.title).collect()
}


#[test]
fn seeded_store() {
    let store = Store::from_config(&StoreConfig { seed_sample_data: true });
    let books = store.books();
    let authors = store.authors();
    assert_eq!(books.len(), 1);
    assert_eq!(authors.len(), 1);
    assert_eq!(books[0].id, BookId(1));
    assert_eq!(books[0].title, "book's title");
    assert_eq!(authors[0].name, "author's name");
    assert_eq!(store.authors_of(BookId(1)), authors);
    assert_eq!(store.books_of(AuthorId(1)), books);

    let empty = Store::from_config(&StoreConfig { seed_sample_data: false });
    assert!(empty.books().is_empty());
    assert!(empty.authors().is_empty());
}

#[test]
fn authors_follow_author_order_not_link_order() {
    let store = Store::new();
    let a = store.create_author(author("a"));
    let b = store.create_author(author("b"));
    let c = store.create_author(author("c"));

    let x = store.create_book(book("x", &[c.id.0, a.id.0]));
    assert_eq!(store.authors_of(x.id), vec![a.clone(), c.clone()]);
    assert!(store.authors_of(BookId(999)).is_empty());

    // Inverse relation
    assert_eq!(store.books_of(a.id), vec![x.clone()]);
    assert_eq!(store.books_of(c.id), vec![x.clone()]);
    assert!(store.books_of(b.id).is_empty());
}

#[test]
fn relations_are_inverse() {
    let store = Store::new();
    let authors = (0..4).map(|i| store.create_author(author(&format!("a{i}")))).collect::<Vec<_>>();
    let books = [
        store.create_book(book("one", &[1, 2])),
        store.create_book(book("two", &[2, 3, 4])),
        store.create_book(book("three", &[])),
    ];
    store.create_author(NewAuthor {
        name: "late".into(),
        book_ids: Some(vec![BookId(3), BookId(1)]),
    });

    for b in &books {
        for a in store.authors() {
            let forward = store.authors_of(b.id).contains(&a);
            let backward = store.books_of(a.id).contains(b);
            assert_eq!(forward, backward, "book {} / author {}", b.id, a.id);
        }
    }

    assert_eq!(store.authors_of(books[1].id), authors[1..].to_vec());
    assert_eq!(store.authors_of(books[2].id).len(), 1);
}

#[test]
fn duplicate_and_dangling_links() {
    let store = Store::new();
    let a = store.create_author(author("a"));
    let b = store.create_book(book("dup", &[a.id.0, a.id.0, 42]));

    assert_eq!(store.lock().links.len(), 3);
    assert_eq!(store.authors_of(b.id), vec![a.clone()]);
    assert_eq!(store.books_of(a.id), vec![b]);
}

#[test]
fn create_book_assigns_fresh_ids() {
    let store = Store::new();
    let first = store.create_book(book("first", &[]));
    let second = store.create_book(book("second", &[]));
    assert_ne!(first.id, second.id);

    // Deleting the last book must not free its ID.
    store.delete_book(second.id).unwrap();
    let third = store.create_book(NewBook { title: "T".into(), ..NewBook::default() });
    assert_ne!(third.id, first.id);
    assert_ne!(third.id, second.id);
    assert!(titles(&store).contains(&"T".to_string()));
}

#[test]
fn update_missing_book_leaves_store_unchanged() {
    let store = Store::from_config(&StoreConfig { seed_sample_data: true });
    let books_before = store.books();
    let links_before = store.lock().links.clone();

    assert_eq!(store.update_book(BookId(77), book("X", &[1])), None);
    assert_eq!(store.books(), books_before);
    assert_eq!(store.lock().links, links_before);
}

#[test]
fn update_is_full_replacement() {
    let store = Store::new();
    let a = store.create_author(author("a"));
    let old = store.create_book(NewBook {
        title: "old".into(),
        author_ids: Some(vec![a.id]),
        release_date: Some("1999".into()),
    });
    let other = store.create_book(book("other", &[]));

    let new = store.update_book(old.id, NewBook { title: "new".into(), ..NewBook::default() })
        .unwrap();
    assert_eq!(new.id, old.id);
    assert_eq!(new.title, "new");
    assert_eq!(new.release_date, None);

    // Replaced row moves to the end, links untouched without `author_ids`.
    assert_eq!(store.books(), vec![other, new.clone()]);
    assert_eq!(store.authors_of(new.id), vec![a]);
}

#[test]
fn update_rewrites_links() {
    let store = Store::new();
    let a = store.create_author(author("a"));
    let b = store.create_author(author("b"));

    let created = store.create_book(book("A", &[a.id.0]));
    let updated = store.update_book(created.id, book("B", &[a.id.0])).unwrap();
    assert_eq!(updated.title, "B");
    assert_eq!(store.authors_of(updated.id), vec![a.clone()]);
    assert_eq!(store.lock().links.len(), 1);

    store.update_book(created.id, book("C", &[b.id.0])).unwrap();
    assert_eq!(store.authors_of(created.id), vec![b]);
    assert!(store.books_of(a.id).is_empty());

    store.update_book(created.id, book("D", &[])).unwrap();
    assert!(store.authors_of(created.id).is_empty());
}

#[test]
fn delete_cascades_links() {
    let store = Store::from_config(&StoreConfig { seed_sample_data: true });
    let kept = store.create_book(book("kept", &[1]));

    let removed = store.delete_book(BookId(1)).unwrap();
    assert_eq!(removed.title, "book's title");
    assert_eq!(store.books(), vec![kept.clone()]);
    assert!(store.authors_of(removed.id).is_empty());
    assert!(store.lock().links.iter().all(|l| l.book_id != removed.id));
    assert_eq!(store.books_of(AuthorId(1)), vec![kept]);

    assert_eq!(store.delete_book(BookId(1)), None);
}

#[tokio::test]
async fn create_book_notifies_current_subscribers_only() {
    let store = Store::new();
    let mut first = store.events().subscribe(Topic::BookCreated);
    let mut second = store.events().subscribe(Topic::BookCreated);

    let created = store.create_book(book("news", &[]));
    let mut late = store.events().subscribe(Topic::BookCreated);

    assert_eq!(first.next().await, Some(created.clone()));
    assert_eq!(second.next().await, Some(created));

    // Nothing was published after `late` registered.
    assert!(late.next().now_or_never().is_none());

    // Neither other mutations nor authors are published.
    store.create_author(author("quiet"));
    store.update_book(BookId(1), book("changed", &[])).unwrap();
    store.delete_book(BookId(1)).unwrap();
    assert!(first.next().now_or_never().is_none());
}
