//! The built-in call parser (§4.3.1 / §4.6): the default
//! [`crate::context::NodeParser`] returned by
//! [`crate::context::Spec::get_node_parser`]. Parses a macro/environment/
//! specials occurrence's arguments according to
//! [`crate::context::Spec::argument_specs`] and, for environments, its body
//! up to the matching `\end{name}`.

use crate::collector::NodesCollectorOptions;
use crate::context::{ArgumentSpec, NodeParser, SpecHandle};
use crate::error::{ErrorKind, LatexSyntaxError, NodesParseError};
use crate::nodes::{EnvironmentNode, MacroNode, Node, ParsedArguments, SpecialsNode};
use crate::parsers::general::run_general_nodes;
use crate::parsers::standard_argument::make_argument_parser;
use crate::reader::TokenReader;
use crate::state::ParsingState;
use crate::state_delta::{apply_optional_delta, ParsingStateDelta};
use crate::token::{Token, TokenKind};
use crate::walker::Walker;

#[derive(Debug)]
pub struct CallParser;

impl NodeParser for CallParser {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
        initiating_token: Token,
        spec: &SpecHandle,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let args_state = apply_optional_delta(&state, spec.make_arguments_parsing_state_delta(&state), walker);

        let argspecs = spec.argument_specs().to_vec();
        let mut argnlist: Vec<Option<Node>> = Vec::with_capacity(argspecs.len());
        let mut cur_state = args_state;
        for argspec in &argspecs {
            let arg_parser = make_argument_parser(&argspec.spec);
            let (node, delta) = arg_parser.parse(walker, reader, cur_state.clone())?;
            cur_state = apply_optional_delta(&cur_state, delta, walker);
            argnlist.push(node);
        }
        let args = ParsedArguments::new(argspecs.clone(), argnlist);

        let after_delta = spec.make_after_parsing_state_delta(&state, &args);

        let node = if spec.is_environment() {
            let env_name = initiating_token.arg_text().unwrap_or("").to_string();
            let body_state = apply_optional_delta(&state, spec.make_body_parsing_state_delta(&state, &args), walker);

            let stop_env_name = env_name.clone();
            let mut opts = NodesCollectorOptions::default();
            opts.stop_token_condition = Some(Box::new(move |t: &Token| t.kind() == TokenKind::EndEnvironment && t.arg_text() == Some(stop_env_name.as_str())));
            let mut collector = run_general_nodes(walker, reader, body_state, opts)?;

            let end_tok = match collector.stop_token().cloned() {
                Some(t) => t,
                None => {
                    let nodelist = collector.into_final_nodelist()?;
                    return Err(NodesParseError::new(
                        format!("Unterminated environment '{}'", env_name),
                        initiating_token.pos(),
                        0,
                        0,
                        ErrorKind::UnexpectedEndEnvironment { environment_name: env_name.clone() },
                    )
                    .with_recovery_nodes(nodelist)
                    .into());
                }
            };
            reader.move_past_token(&end_tok, true);

            let nodelist = collector.into_final_nodelist()?;
            let pos_end = reader.cur_pos();
            Node::Environment(EnvironmentNode {
                environmentname: env_name,
                spec: spec.clone(),
                nodelist,
                args,
                parsing_state: state.clone(),
                pos: initiating_token.pos(),
                pos_end,
            })
        } else if initiating_token.kind() == TokenKind::Specials {
            let pos_end = reader.cur_pos();
            Node::Specials(SpecialsNode {
                specials_chars: walker.source()[initiating_token.pos()..initiating_token.pos_end()].to_string(),
                spec: spec.clone(),
                args: Some(args),
                parsing_state: state.clone(),
                pos: initiating_token.pos(),
                pos_end,
            })
        } else {
            let pos_end = reader.cur_pos();
            Node::Macro(MacroNode {
                macroname: initiating_token.arg_text().unwrap_or("").to_string(),
                spec: spec.clone(),
                args,
                macro_post_space: initiating_token.post_space().to_string(),
                parsing_state: state.clone(),
                pos: initiating_token.pos(),
                pos_end,
            })
        };

        Ok((node, after_delta))
    }
}
