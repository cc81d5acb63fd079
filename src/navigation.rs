//! Reader position: canonical numbers to array positions and chapter stepping

use crate::corpus::Corpus;
use crate::search::SearchResult;
use serde::{Deserialize, Serialize};

/// Index-based position inside the primary corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub book_index: usize,
    pub chapter_index: usize,
}

/// Canonical reference persisted across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub book: u32,
    pub chapter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTarget {
    pub book: u32,
    pub chapter: u32,
    pub verse: u32,
}

/// Where selecting a search result (or a jump) takes the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    pub position: ReadingPosition,
    pub focus: FocusTarget,
}

pub fn locate(corpus: &Corpus, book_number: u32, chapter_number: u32) -> Option<ReadingPosition> {
    let book_index = corpus.book_index(book_number)?;
    let chapter_index = corpus.chapter_index(book_index, chapter_number)?;
    Some(ReadingPosition {
        book_index,
        chapter_index,
    })
}

pub fn jump_to(corpus: &Corpus, book: u32, chapter: u32, verse: u32) -> Option<Jump> {
    let position = locate(corpus, book, chapter)?;
    Some(Jump {
        position,
        focus: FocusTarget {
            book,
            chapter,
            verse,
        },
    })
}

pub fn jump_to_result(corpus: &Corpus, result: &SearchResult) -> Option<Jump> {
    jump_to(corpus, result.book_number, result.chapter, result.verse)
}

/// Canonical numbers of a position, if it is inside the corpus.
pub fn selection_at(corpus: &Corpus, position: ReadingPosition) -> Option<Selection> {
    let book = corpus.book_at(position.book_index)?;
    let chapter = corpus.chapter_at(position.book_index, position.chapter_index)?;
    Some(Selection {
        book: book.number,
        chapter: chapter.number,
    })
}

/// Apply a saved selection. The book is restored even when its chapter no
/// longer exists; an unknown book leaves `current` unchanged.
pub fn restore(corpus: &Corpus, saved: Selection, current: ReadingPosition) -> ReadingPosition {
    let Some(book_index) = corpus.book_index(saved.book) else {
        return current;
    };
    let chapter_index = corpus.chapter_index(book_index, saved.chapter).unwrap_or(0);
    ReadingPosition {
        book_index,
        chapter_index,
    }
}

pub fn next_chapter(corpus: &Corpus, position: ReadingPosition) -> Option<ReadingPosition> {
    let book = corpus.book_at(position.book_index)?;
    if position.chapter_index + 1 < book.chapters.len() {
        return Some(ReadingPosition {
            chapter_index: position.chapter_index + 1,
            ..position
        });
    }
    corpus.book_at(position.book_index + 1)?;
    Some(ReadingPosition {
        book_index: position.book_index + 1,
        chapter_index: 0,
    })
}

pub fn previous_chapter(corpus: &Corpus, position: ReadingPosition) -> Option<ReadingPosition> {
    corpus.book_at(position.book_index)?;
    if position.chapter_index > 0 {
        return Some(ReadingPosition {
            chapter_index: position.chapter_index - 1,
            ..position
        });
    }
    let book_index = position.book_index.checked_sub(1)?;
    let previous = corpus.book_at(book_index)?;
    Some(ReadingPosition {
        book_index,
        chapter_index: previous.chapters.len().saturating_sub(1),
    })
}
