use super::error::TreeError;
use super::node::NodeId;
use super::tree::Tree;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};

// ------------------------------------------------------------------------------------------------
// Errors
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// nom error that keeps every context it passed through, so that a failure
/// deep inside a clade still reports where it was.
#[derive(Clone, Debug, PartialEq)]
struct DetailedError<'a> {
    errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Recursive parse result, flattened into the arena afterwards
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ParsedNode {
    name: Option<String>,
    length: Option<f64>,
    children: Vec<ParsedNode>,
}

impl ParsedNode {
    fn into_tree(self, tree: &mut Tree) -> NodeId {
        let id = tree.add_node();
        for child in self.children {
            let child_id = child.into_tree(tree);
            tree.add_child(id, child_id);
        }
        if let Some(node) = tree.get_node_mut(id) {
            node.name = self.name;
            node.length = self.length;
        }
        id
    }
}

// ------------------------------------------------------------------------------------------------
// Parsers
// ------------------------------------------------------------------------------------------------

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Unquoted labels stop at newick punctuation; 'quoted' labels use '' for a literal quote.
fn parse_label(input: &str) -> IResult<&str, String, DetailedError<'_>> {
    let unquoted = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });

    let quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    context("label", alt((quoted, unquoted))).parse(input)
}

fn parse_length(input: &str) -> IResult<&str, f64, DetailedError<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// [comments] carry nothing a hub needs
fn skip_comment(input: &str) -> IResult<&str, (), DetailedError<'_>> {
    map(
        opt(delimited(ws(char('[')), take_while(|c| c != ']'), char(']'))),
        |_| (),
    )
    .parse(input)
}

fn parse_subtree(input: &str) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), parse_subtree),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, label) = opt(parse_label).parse(input)?;
    let (input, _) = skip_comment(input)?;
    let (input, length) = opt(parse_length).parse(input)?;
    let (input, _) = skip_comment(input)?;

    let node = ParsedNode {
        name: label.filter(|l| !l.is_empty()),
        length,
        children: children.unwrap_or_default(),
    };

    Ok((input, node))
}

// ------------------------------------------------------------------------------------------------
// Entry point
// ------------------------------------------------------------------------------------------------

/// Parses one newick tree terminated by `;`.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    let mut parser = (ws(parse_subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (root_node, _))) => {
            let mut tree = Tree::new();
            let root_id = root_node.into_tree(&mut tree);
            tree.set_root(root_id);
            Ok(tree)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(TreeError::Truncated),
    }
}

fn make_tree_error(input: &str, e: DetailedError) -> TreeError {
    let remaining = e.errors.first().map(|(r, _)| *r).unwrap_or(input);
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - last_newline + 1;

    let mut msg = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => {
                msg.push_str(&format!("while parsing {}:\n", ctx));
            }
            DetailedErrorKind::Nom(k) => {
                msg.push_str(&format!("  error: {:?}\n", k));
            }
        }
    }

    TreeError::Syntax {
        line,
        column,
        reason: msg,
        near: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a newick string.
    ///
    /// ```
    /// use hal2hub::libs::phylo::Tree;
    ///
    /// let tree = Tree::from_newick("((human:0.006,chimp:0.006)Anc1:0.02,gorilla:0.03)Anc0;").unwrap();
    /// assert_eq!(tree.len(), 5);
    /// assert!(Tree::from_newick("(human,chimp:x)Anc0;").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_hal_tree() {
        let tree = Tree::from_newick("((human:0.006,chimp:0.006)Anc1:0.02,gorilla:0.03)Anc0;")
            .unwrap();
        assert_eq!(tree.len(), 5);

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name.as_deref(), Some("Anc0"));
        assert_eq!(root.children.len(), 2);

        let anc1 = tree.get_node(root.children[0]).unwrap();
        assert_eq!(anc1.name.as_deref(), Some("Anc1"));
        assert_eq!(anc1.length, Some(0.02));
    }

    #[test]
    fn test_parser_whitespace_and_comments() {
        let input = "
        (
            human : 0.1 [leaf],
            'mouse strain' : 2e-1
        ) Anc0 ;
        ";
        let tree = Tree::from_newick(input).unwrap();
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        let c0 = tree.get_node(root.children[0]).unwrap();
        let c1 = tree.get_node(root.children[1]).unwrap();
        assert_eq!(c0.name.as_deref(), Some("human"));
        assert_eq!(c1.name.as_deref(), Some("mouse strain"));
        assert_eq!(c1.length, Some(0.2));
    }

    #[test]
    fn test_parser_unnamed_nodes() {
        let tree = Tree::from_newick("(A,(B,C));").unwrap();
        assert_eq!(tree.len(), 5);
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert!(root.name.is_none());
    }

    #[test]
    fn test_parser_error() {
        match Tree::from_newick("(A,B)C") {
            Err(TreeError::Syntax { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 7);
            }
            other => panic!("Expected a syntax error, got {:?}", other),
        }

        match Tree::from_newick("(A,B:oops)C;") {
            Err(TreeError::Syntax { reason, .. }) => assert!(reason.contains("length")),
            other => panic!("Expected a syntax error, got {:?}", other),
        }
    }
}
