//! Micro-block application to the liquid block.

use tidal_types::{Block, MicroBlock};
use tracing::trace;

use crate::{NgError, Result};

/// Build the liquid block version produced by applying `micro` to `top`.
///
/// The micro-block must reference `top`, come from `top`'s generator and
/// carry valid signatures; the rebuilt block must have the ID the micro-block
/// announced.
pub fn extend_block(top: &Block, micro: &MicroBlock) -> Result<Block> {
    if micro.reference != top.id() {
        return Err(NgError::ReferenceMismatch {
            reference: micro.reference,
            top: top.id(),
        });
    }
    if micro.sender != *top.generator() {
        return Err(NgError::SenderMismatch(top.id()));
    }
    if !micro.verify_signature() {
        return Err(NgError::InvalidSignature(format!("micro-block {}", micro.id())));
    }

    let block = top.extended(&micro.transactions, micro.total_block_signature);
    if !block.verify_signature() {
        return Err(NgError::InvalidSignature(format!("liquid block {}", block.id())));
    }
    if block.id() != micro.total_block_id {
        return Err(NgError::IdMismatch {
            expected: micro.total_block_id,
            actual: block.id(),
        });
    }

    trace!(
        id = %block.id(),
        parent = %top.id(),
        transactions = block.transactions.len(),
        "Liquid block extended"
    );
    Ok(block)
}
