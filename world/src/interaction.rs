use geomerge_core::{InteractionError, Token};

/// State change produced by a click on a cell within reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    Collect(Token),
    Craft { consumed: Token, produced: Token },
    Place(Token),
}

/// Resolves the collect/craft/place table for the held token and cell content.
pub(crate) fn resolve(
    holding: Option<Token>,
    content: Option<Token>,
) -> Result<Transition, InteractionError> {
    match (holding, content) {
        (None, Some(found)) => Ok(Transition::Collect(found)),
        (Some(held), Some(found)) if held == found => held
            .doubled()
            .map(|produced| Transition::Craft {
                consumed: held,
                produced,
            })
            .ok_or(InteractionError::ValueOverflow { held }),
        (Some(held), Some(found)) => Err(InteractionError::Mismatch { held, found }),
        (Some(held), None) => Ok(Transition::Place(held)),
        (None, None) => Err(InteractionError::NothingToDo),
    }
}
