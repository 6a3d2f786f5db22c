#![allow(dead_code)]

use booklog::{Book, BookStatus, BookStore, MemoryStorage, ReadingLog, DEFAULT_STORAGE_KEY};
use std::sync::Arc;

pub const CREATED_AT: &str = "2024-01-01T09:00:00.000Z";

pub fn book(id: &str, title: &str) -> Book {
    Book::new(id, title, "테스트 저자", 300).with_created_at(CREATED_AT)
}

pub fn book_with(id: &str, status: BookStatus, current_page: u32) -> Book {
    book(id, &format!("책 {id}"))
        .with_status(status)
        .with_current_page(current_page)
}

pub fn reading_log(id: &str, start_page: u32, end_page: u32) -> ReadingLog {
    ReadingLog::new(id, start_page, end_page).with_date("2024-02-01T20:00:00.000Z")
}

/// A small library covering every status, with logs on the book in progress.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("book-1", "클린 코드", "로버트 C. 마틴", 584)
            .with_status(BookStatus::Read)
            .with_current_page(584)
            .with_rating(5.0)
            .with_review("모든 개발자가 읽어야 할 필독서")
            .with_start_date("2024-01-01")
            .with_end_date("2024-01-15")
            .with_created_at(CREATED_AT),
        Book::new("book-2", "리팩터링", "마틴 파울러", 418)
            .with_status(BookStatus::Reading)
            .with_current_page(200)
            .with_start_date("2024-02-01")
            .with_log(reading_log("log-1", 1, 100).with_content("첫 100페이지 완료"))
            .with_log(reading_log("log-2", 101, 200).with_content("리팩터링 기법들이 유용함"))
            .with_created_at(CREATED_AT),
        Book::new("book-3", "이펙티브 타입스크립트", "댄 밴더캄", 280).with_created_at(CREATED_AT),
        Book::new("book-4", "함수형 프로그래밍", "루이스 아텐시오", 400)
            .with_status(BookStatus::Stopped)
            .with_current_page(150)
            .with_start_date("2024-03-01")
            .with_created_at(CREATED_AT),
    ]
}

pub fn stored_books(storage: &MemoryStorage) -> Option<Vec<Book>> {
    use booklog::Storage;
    storage
        .get(DEFAULT_STORAGE_KEY)
        .unwrap()
        .map(|json| serde_json::from_str(&json).unwrap())
}

/// Fresh in-memory storage and a store over it.
pub fn memory_store() -> (Arc<MemoryStorage>, BookStore) {
    let storage = Arc::new(MemoryStorage::new());
    let store = BookStore::open(Arc::clone(&storage));
    (storage, store)
}

pub fn ids(books: &[Book]) -> Vec<&str> {
    books.iter().map(|b| b.id.as_str()).collect()
}
