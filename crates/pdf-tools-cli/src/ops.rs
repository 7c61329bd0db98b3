//! Edit operations given on the command line
//!
//! Page numbers are display numbers at the time the operation runs, so
//! earlier operations shift the numbering seen by later ones.

use anyhow::{Context, Result, anyhow, bail};
use pdf_pages::{PageId, PageManager, load_pdf_bytes};
use std::path::PathBuf;
use std::str::FromStr;

/// Where inserted pages go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    After(u32),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// `delete:N`
    Delete(u32),
    /// `blank:N` or `blank:end`
    Blank(Position),
    /// `dup:N`
    Duplicate(u32),
    /// `move:A:B` moves page A to where page B is
    Move { from: u32, to: u32 },
    /// `insert:PATH:N` or `insert:PATH:end`
    Insert { path: PathBuf, at: Position },
}

fn parse_number(text: &str) -> Result<u32> {
    let number: u32 = text
        .parse()
        .with_context(|| format!("Invalid page number '{}'", text))?;
    if number == 0 {
        bail!("Page numbers start at 1");
    }
    Ok(number)
}

fn parse_position(text: &str) -> Result<Position> {
    if text.eq_ignore_ascii_case("end") {
        Ok(Position::End)
    } else {
        parse_number(text).map(Position::After)
    }
}

impl FromStr for EditOp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Expected KIND:ARGS, got '{}'", s))?;

        match kind {
            "delete" => Ok(Self::Delete(parse_number(rest)?)),
            "blank" => Ok(Self::Blank(parse_position(rest)?)),
            "dup" => Ok(Self::Duplicate(parse_number(rest)?)),
            "move" => {
                let (from, to) = rest
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Expected move:FROM:TO, got '{}'", s))?;
                Ok(Self::Move {
                    from: parse_number(from)?,
                    to: parse_number(to)?,
                })
            }
            // The path may contain ':' itself
            "insert" => {
                let (path, at) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| anyhow!("Expected insert:PATH:POSITION, got '{}'", s))?;
                if path.is_empty() {
                    bail!("Missing path in '{}'", s);
                }
                Ok(Self::Insert {
                    path: PathBuf::from(path),
                    at: parse_position(at)?,
                })
            }
            other => bail!("Unknown operation '{}'", other),
        }
    }
}

fn page_at(manager: &PageManager, display_number: u32) -> Result<PageId> {
    manager
        .model()
        .find_by_display_number(display_number)
        .map(|page| page.id)
        .ok_or_else(|| anyhow!("No page {}", display_number))
}

fn anchor(manager: &PageManager, position: Position) -> Result<Option<PageId>> {
    match position {
        Position::After(n) => page_at(manager, n).map(Some),
        Position::End => Ok(None),
    }
}

impl EditOp {
    pub async fn apply(&self, manager: &mut PageManager) -> Result<()> {
        match self {
            Self::Delete(n) => {
                let id = page_at(manager, *n)?;
                manager.delete_pages(&[id]);
            }
            Self::Blank(position) => {
                let after = anchor(manager, *position)?;
                manager.insert_blank(after);
            }
            Self::Duplicate(n) => {
                let id = page_at(manager, *n)?;
                manager.duplicate(id, None)?;
            }
            Self::Move { from, to } => {
                let from = page_at(manager, *from)?;
                let to = page_at(manager, *to)?;
                manager.reorder(from, to);
            }
            Self::Insert { path, at } => {
                let after = anchor(manager, *at)?;
                let bytes = load_pdf_bytes(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let source = manager.insert_from_upload(bytes, after).await?;
                log::info!("Inserted {} as {}", path.display(), source);
            }
        }
        log::debug!("Applied {:?}", self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ops() {
        assert_eq!("delete:3".parse::<EditOp>().unwrap(), EditOp::Delete(3));
        assert_eq!(
            "blank:end".parse::<EditOp>().unwrap(),
            EditOp::Blank(Position::End)
        );
        assert_eq!(
            "blank:2".parse::<EditOp>().unwrap(),
            EditOp::Blank(Position::After(2))
        );
        assert_eq!("dup:1".parse::<EditOp>().unwrap(), EditOp::Duplicate(1));
        assert_eq!(
            "move:4:1".parse::<EditOp>().unwrap(),
            EditOp::Move { from: 4, to: 1 }
        );
    }

    #[test]
    fn test_parse_insert_path_with_colon() {
        let op: EditOp = "insert:C:/docs/extra.pdf:end".parse().unwrap();
        assert_eq!(
            op,
            EditOp::Insert {
                path: PathBuf::from("C:/docs/extra.pdf"),
                at: Position::End,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("delete".parse::<EditOp>().is_err());
        assert!("delete:0".parse::<EditOp>().is_err());
        assert!("delete:x".parse::<EditOp>().is_err());
        assert!("move:1".parse::<EditOp>().is_err());
        assert!("insert::end".parse::<EditOp>().is_err());
        assert!("rotate:1".parse::<EditOp>().is_err());
    }

    #[tokio::test]
    async fn test_apply_uses_current_numbering() {
        use pdf_pages::{SourceDocument, SourceId};
        use std::sync::Arc;

        let mut manager = PageManager::default();
        manager.open(Some(SourceDocument::new(
            SourceId::Original,
            Arc::new(Vec::new()),
            3,
        )));

        EditOp::Delete(1).apply(&mut manager).await.unwrap();
        // Former page 3 is now page 2
        EditOp::Duplicate(2).apply(&mut manager).await.unwrap();
        EditOp::Blank(Position::End).apply(&mut manager).await.unwrap();

        let visible: Vec<_> = manager
            .model()
            .visible_pages()
            .map(|p| (p.source_page_index(), p.is_blank()))
            .collect();
        assert_eq!(
            visible,
            vec![
                (Some(2), false),
                (Some(3), false),
                (Some(3), false),
                (None, true)
            ]
        );

        assert!(EditOp::Delete(9).apply(&mut manager).await.is_err());
    }
}
