//! The general-nodes content parser: runs a [`NodesCollector`] to
//! completion and hands back the finished collector, for callers (the
//! delimited-group/math parsers, environment bodies) that need a node list
//! plus its stop reason rather than a single node.

use crate::collector::{NodesCollector, NodesCollectorOptions};
use crate::error::LatexSyntaxError;
use crate::reader::TokenReader;
use crate::state::ParsingState;
use crate::walker::Walker;

pub fn run_general_nodes<'a>(
    walker: &mut Walker,
    reader: &mut TokenReader,
    state: ParsingState,
    opts: NodesCollectorOptions<'a>,
) -> Result<NodesCollector<'a>, LatexSyntaxError> {
    let mut collector = NodesCollector::new(state, opts);
    collector.process_tokens(walker, reader)?;
    Ok(collector)
}
