//! Corpus data model: translations, books, chapters and verses

use crate::error::LectioError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Highest canonical book number of the old division. 40..=66 is the new division.
pub const OLD_DIVISION_LAST_BOOK: u32 = 39;

/// Highest canonical book number.
pub const LAST_BOOK: u32 = 66;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    Old,
    New,
}

impl Division {
    pub fn of(book_number: u32) -> Self {
        if book_number <= OLD_DIVISION_LAST_BOOK {
            Division::Old
        } else {
            Division::New
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    /// Source order, not necessarily sorted by number
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub number: u32,
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn division(&self) -> Division {
        Division::of(self.number)
    }
}

/// On-disk shape of a translation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    pub translation: String,
    #[serde(default)]
    pub language: String,
    pub books: Vec<Book>,
}

/// Canonical number -> array position, built once per corpus.
#[derive(Debug, Clone, Default)]
struct NumberIndex {
    books: HashMap<u32, usize>,
    chapters: Vec<HashMap<u32, usize>>,
}

impl NumberIndex {
    fn build(books: &[Book]) -> Self {
        let mut index = NumberIndex {
            books: HashMap::with_capacity(books.len()),
            chapters: Vec::with_capacity(books.len()),
        };
        for (book_idx, book) in books.iter().enumerate() {
            // First occurrence wins, same as a linear findIndex
            index.books.entry(book.number).or_insert(book_idx);
            let mut chapters = HashMap::with_capacity(book.chapters.len());
            for (chapter_idx, chapter) in book.chapters.iter().enumerate() {
                chapters.entry(chapter.number).or_insert(chapter_idx);
            }
            index.chapters.push(chapters);
        }
        index
    }
}

/// One loaded translation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Corpus {
    id: String,
    label: String,
    language: String,
    books: Vec<Book>,
    index: NumberIndex,
}

impl Corpus {
    pub fn new(id: impl Into<String>, label: impl Into<String>, books: Vec<Book>) -> Self {
        let index = NumberIndex::build(&books);
        Self {
            id: id.into(),
            label: label.into(),
            language: String::new(),
            books,
            index,
        }
    }

    pub fn from_file(id: impl Into<String>, file: CorpusFile) -> Self {
        let mut corpus = Self::new(id, file.translation, file.books);
        corpus.language = file.language;
        corpus
    }

    /// Parse a translation file and check canonical book numbering.
    pub fn from_json(id: impl Into<String>, bytes: &[u8]) -> Result<Self, LectioError> {
        let id = id.into();
        let file: CorpusFile = serde_json::from_slice(bytes)?;
        if let Some(book) = file
            .books
            .iter()
            .find(|b| b.number == 0 || b.number > LAST_BOOK)
        {
            return Err(LectioError::Corpus(format!(
                "{}: book number {} outside 1..={}",
                id, book.number, LAST_BOOK
            )));
        }
        Ok(Self::from_file(id, file))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book_index(&self, book_number: u32) -> Option<usize> {
        self.index.books.get(&book_number).copied()
    }

    pub fn chapter_index(&self, book_idx: usize, chapter_number: u32) -> Option<usize> {
        self.index.chapters.get(book_idx)?.get(&chapter_number).copied()
    }

    pub fn book_by_number(&self, book_number: u32) -> Option<&Book> {
        self.book_index(book_number).map(|idx| &self.books[idx])
    }

    pub fn book_title(&self, book_number: u32) -> Option<&str> {
        self.book_by_number(book_number).map(|b| b.title.as_str())
    }

    pub fn book_at(&self, book_idx: usize) -> Option<&Book> {
        self.books.get(book_idx)
    }

    pub fn chapter_at(&self, book_idx: usize, chapter_idx: usize) -> Option<&Chapter> {
        self.books.get(book_idx)?.chapters.get(chapter_idx)
    }

    pub fn verse_count(&self) -> usize {
        self.books
            .iter()
            .flat_map(|b| b.chapters.iter())
            .map(|c| c.verses.len())
            .sum()
    }
}
