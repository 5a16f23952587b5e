use funar::parse_source;

fn descriptions(source: &str) -> Vec<(String, Option<String>)> {
    parse_source(source)
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.description))
        .collect()
}

fn owned(pairs: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
    pairs
        .iter()
        .map(|(n, d)| (n.to_string(), d.map(str::to_string)))
        .collect()
}

#[test]
fn each_function_takes_its_leading_comment() {
    let source = r#"
/**
 * List ports
 */
function list () {

}

/**
 * Connect to the serial port
 */
function connect ({path}) {}
"#;
    assert_eq!(
        descriptions(source),
        owned(&[
            ("list", Some("List ports")),
            ("connect", Some("Connect to the serial port")),
        ])
    );
}

#[test]
fn intervening_declaration_blocks_attribution() {
    let source = r#"
/**
 * Only for the first one
 */
function first () {}
function second (a) {}
"#;
    assert_eq!(
        descriptions(source),
        owned(&[("first", Some("Only for the first one")), ("second", None)])
    );
}

#[test]
fn comment_documenting_other_statement_is_rejected() {
    let source = r#"
/**
 * Retry limit
 */
const LIMIT = 10;
function retry (count) {}
"#;
    assert_eq!(descriptions(source), owned(&[("retry", None)]));
}

#[test]
fn plain_comments_are_not_documentation() {
    let source = r#"
/* regular block */
// line comment
function plain (a) {}
"#;
    assert_eq!(descriptions(source), owned(&[("plain", None)]));
}

#[test]
fn typedef_comment_does_not_describe_following_function() {
    let source = r#"
/**
 * @typedef Options
 * @description connection options
 * @prop {string} host
 */
function open (options) {}
"#;
    assert_eq!(descriptions(source), owned(&[("open", None)]));
}

#[test]
fn comments_inside_other_statements_are_skipped() {
    let source = r#"
app.command(
	'connect',
	/** @param {Object} options connect options */
	({path}) => {}
);

/**
 * Close the port
 */
export async function close (port) {}
"#;
    assert_eq!(
        descriptions(source),
        owned(&[("close", Some("Close the port"))])
    );
}
