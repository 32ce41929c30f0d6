use index::Passage;

use crate::document::AssembledContext;

/// Builds the prompt context from a selection and retrieved passages.
///
/// `passages` are re-sorted by descending score (stable, so ties keep retrieval
/// order) before admission. Blank selections are treated as absent. A selection
/// longer than `budget` is clipped to keep the total bound; `ChatPipeline`
/// refuses such selections before calling this.
pub fn assemble(
    passages: &[Passage],
    selected_text: Option<&str>,
    budget: usize,
) -> AssembledContext {
    let mut ctx = AssembledContext::default();
    let mut used = 0usize;

    if let Some(selected) = selected_text.filter(|s| !s.trim().is_empty()) {
        let len = selected.chars().count();
        let chunk = if len > budget {
            clip_chars(selected, budget).to_string()
        } else {
            selected.to_string()
        };
        used += chunk.chars().count();
        if !chunk.is_empty() {
            ctx.ordered_chunks.push(chunk);
        }
    }

    let mut ranked: Vec<&Passage> = passages.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    for passage in ranked {
        let len = passage.text.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        ctx.ordered_chunks.push(passage.text.clone());
        ctx.source_list.push(passage.clone());
    }

    ctx
}

/// Longest prefix of `text` holding at most `max_chars` chars.
fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
