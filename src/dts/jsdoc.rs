/*!
# JSDoc

Splits a raw `/** ... */` block into its description and block tags.
Tag headers (`@param {Type} name - text`) are parsed with `nom`; everything
after the header, plus continuation lines, is the tag text.
*/

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::{char, space0},
    combinator::{map, opt},
    error::{Error, ErrorKind},
    sequence::{delimited, preceded},
    IResult,
};

/// Tags whose header carries a name after the optional type
const NAMED_TAGS: &[&str] = &["param", "arg", "argument", "property", "prop", "template"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsDoc {
    pub description: String,
    pub tags: Vec<JsDocTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsDocTag {
    pub tag: String,
    pub type_expr: Option<String>,
    pub name: Option<String>,
    pub text: String,
}

impl JsDoc {
    /// Text of the `@param` tag for `name`; dotted tags (`params.symbol`) do not match.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| is_param_tag(&t.tag) && t.name.as_deref() == Some(name))
            .map(|t| t.text.as_str())
    }

    /// Text of the last `@returns`/`@return` tag
    pub fn returns(&self) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .find(|t| t.tag == "returns" || t.tag == "return")
            .map(|t| t.text.as_str())
    }

    pub fn is_deprecated(&self) -> bool {
        self.tags.iter().any(|t| t.tag == "deprecated")
    }
}

fn is_param_tag(tag: &str) -> bool {
    matches!(tag, "param" | "arg" | "argument")
}

/// Parses a raw comment block including its `/**` and `*/` delimiters.
pub fn parse_jsdoc(raw: &str) -> JsDoc {
    let body = raw.trim();
    let body = body.strip_prefix("/**").unwrap_or(body);
    let body = body.strip_suffix("*/").unwrap_or(body);

    let mut description: Vec<&str> = Vec::new();
    let mut tags: Vec<JsDocTag> = Vec::new();

    for line in body.lines().map(clean_line) {
        if line.starts_with('@') {
            if let Ok((_, tag)) = tag_header(line) {
                tags.push(tag);
                continue;
            }
        }
        match tags.last_mut() {
            Some(tag) => {
                if tag.text.is_empty() {
                    tag.text = line.trim().to_string();
                } else {
                    tag.text.push('\n');
                    tag.text.push_str(line);
                }
            }
            None => description.push(line),
        }
    }

    for tag in &mut tags {
        tag.text = tag.text.trim().to_string();
    }

    JsDoc {
        description: description.join("\n").trim().to_string(),
        tags,
    }
}

/// Strips the leading ` * ` decoration of a comment line.
fn clean_line(line: &str) -> &str {
    let trimmed = line.trim_start();
    let without_star = trimmed.strip_prefix('*').unwrap_or(trimmed);
    let without_space = without_star.strip_prefix(' ').unwrap_or(without_star);
    without_space.trim_end()
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    preceded(
        char('@'),
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )(input)
}

/// `{...}` with nested braces, returning the inner text.
fn braced_type(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], input[1..i].trim()));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}

/// `name`, `params.symbol` or `[name=default]` (the default is dropped)
fn param_name(input: &str) -> IResult<&str, &str> {
    alt((
        map(delimited(char('['), is_not("]"), char(']')), |inner: &str| {
            inner.split('=').next().unwrap_or(inner).trim()
        }),
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '.'),
    ))(input)
}

fn tag_header(input: &str) -> IResult<&str, JsDocTag> {
    let (input, tag) = tag_name(input)?;
    let (input, _) = space0(input)?;
    let (input, type_expr) = opt(braced_type)(input)?;
    let (input, _) = space0(input)?;

    let (input, name) = if NAMED_TAGS.contains(&tag) {
        opt(param_name)(input)?
    } else {
        (input, None)
    };

    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(char('-'), space0))(input)?;

    Ok((
        "",
        JsDocTag {
            tag: tag.to_string(),
            type_expr: type_expr.map(str::to_string),
            name: name.map(str::to_string),
            text: input.trim_end().to_string(),
        },
    ))
}
