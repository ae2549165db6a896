//! A checker for the small subset of GLSL the software device understands.
//!
//! It does not generate code. It validates the structure of a shader closely
//! enough to produce driver-like diagnostics (missing `#version`, unbalanced
//! braces, undeclared identifiers) and extracts the interface the rasterizer
//! needs: which input carries the position, and the constant color written by
//! the fragment stage.

use gl;
use gl::types::GLenum;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Punct(char),
}

#[derive(Clone, Debug, PartialEq)]
struct Spanned {
    token: Token,
    line: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interface {
    /// `(location, type, name)` of every `in` variable.
    pub inputs: Vec<(Option<u32>, String, String)>,
    /// `(type, name)` of every `out` variable.
    pub outputs: Vec<(String, String)>,
    pub writes_position: bool,
    /// The color a fragment stage writes when it assigns a constant `vec4`
    /// to its output.
    pub constant_color: Option<[f32; 4]>,
}

impl Interface {
    /// The attribute slot read as the vertex position: the input at
    /// location 0, or the first input when none has an explicit location.
    pub fn position_slot(&self) -> Option<u32> {
        let explicit = self.inputs.iter().find(|(loc, _, _)| *loc == Some(0));
        match explicit {
            Some(_) => Some(0),
            None => self
                .inputs
                .iter()
                .position(|(loc, _, _)| loc.is_none())
                .map(|i| i as u32),
        }
    }
}

const TYPES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4",
    "uvec2", "uvec3", "uvec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4",
];

const KEYWORDS: &[&str] = &[
    "main", "return", "if", "else", "for", "while", "do", "break", "continue", "discard", "const",
    "true", "false", "in", "out", "inout", "uniform", "layout", "location", "precision", "highp",
    "mediump", "lowp", "flat", "smooth",
];

const FUNCTIONS: &[&str] = &[
    "abs", "sign", "floor", "ceil", "fract", "mod", "min", "max", "clamp", "mix", "step",
    "smoothstep", "sqrt", "pow", "exp", "log", "sin", "cos", "tan", "length", "distance", "dot",
    "cross", "normalize",
];

const VERTEX_BUILTINS: &[&str] = &["gl_Position", "gl_PointSize", "gl_VertexID", "gl_InstanceID"];
const FRAGMENT_BUILTINS: &[&str] = &["gl_FragCoord", "gl_FrontFacing", "gl_PointCoord", "gl_FragDepth"];

fn error(line: usize, message: &str) -> String {
    format!("0:{}(1): error: {}\n", line, message)
}

struct Source {
    version: Option<(usize, u32)>,
    tokens: Vec<Spanned>,
}

fn lex(source: &str) -> Result<Source, String> {
    let mut tokens = Vec::new();
    let mut version = None;
    let mut in_block_comment = false;

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let mut line = raw_line;

        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    in_block_comment = false;
                    line = &line[end + 2..];
                }
                None => continue,
            }
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let directive = trimmed[1..].trim();
            if directive.starts_with("version") {
                if version.is_some() || !tokens.is_empty() {
                    return Err(error(line_no, "#version must occur before anything else in the shader"));
                }
                let number = directive["version".len()..]
                    .split_whitespace()
                    .next()
                    .and_then(|n| n.parse::<u32>().ok());
                match number {
                    Some(n) if n >= 330 => version = Some((line_no, n)),
                    Some(n) => {
                        return Err(error(line_no, &format!("GLSL {} is not supported by a 3.3 core context", n)))
                    }
                    None => return Err(error(line_no, "invalid #version directive")),
                }
            }
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '/' && chars.get(i + 1) == Some(&'/') {
                break;
            }
            if c == '/' && chars.get(i + 1) == Some(&'*') {
                let rest: String = chars[i + 2..].iter().collect();
                match rest.find("*/") {
                    Some(end) => {
                        i += 2 + rest[..end].chars().count() + 2;
                        continue;
                    }
                    None => {
                        in_block_comment = true;
                        break;
                    }
                }
            }
            if c.is_whitespace() || c == '\0' {
                i += 1;
            } else if c.is_ascii_alphabetic() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Ident(chars[start..i].iter().collect()),
                    line: line_no,
                });
            } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit())) {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Number(chars[start..i].iter().collect()),
                    line: line_no,
                });
            } else {
                tokens.push(Spanned { token: Token::Punct(c), line: line_no });
                i += 1;
            }
        }
    }

    Ok(Source { version, tokens })
}

fn parse_number(text: &str) -> Option<f32> {
    text.trim_end_matches(|c| c == 'f' || c == 'F').parse::<f32>().ok()
}

fn ident(tokens: &[Spanned], i: usize) -> Option<&str> {
    match tokens.get(i).map(|t| &t.token) {
        Some(Token::Ident(name)) => Some(name.as_str()),
        _ => None,
    }
}

fn punct(tokens: &[Spanned], i: usize, c: char) -> bool {
    tokens.get(i).map(|t| &t.token) == Some(&Token::Punct(c))
}

/// Checks `source` as a shader of `kind` (`VERTEX_SHADER` or
/// `FRAGMENT_SHADER`). On failure returns the info log.
pub fn check(kind: GLenum, source: &str) -> Result<Interface, String> {
    let Source { version, tokens } = lex(source)?;
    if version.is_none() {
        return Err(error(1, "missing #version directive"));
    }

    let last_line = tokens.last().map_or(1, |t| t.line);

    // Bracket balance
    let mut stack: Vec<(char, usize)> = Vec::new();
    for t in &tokens {
        match t.token {
            Token::Punct(open @ '(') | Token::Punct(open @ '{') | Token::Punct(open @ '[') => {
                stack.push((open, t.line))
            }
            Token::Punct(close @ ')') | Token::Punct(close @ '}') | Token::Punct(close @ ']') => {
                let expected = match close {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Err(error(t.line, &format!("syntax error, unexpected '{}'", close))),
                }
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(error(last_line, "syntax error, unexpected end of file"));
    }

    let has_main = (0..tokens.len()).any(|i| {
        ident(&tokens, i) == Some("void")
            && ident(&tokens, i + 1) == Some("main")
            && punct(&tokens, i + 2, '(')
            && punct(&tokens, i + 3, ')')
    });
    if !has_main {
        return Err(error(last_line, "no function with name 'main'"));
    }

    let mut interface = Interface::default();
    let mut declared: Vec<String> = Vec::new();
    let mut pending_location: Option<u32> = None;
    let mut depth = 0usize;

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].token {
            Token::Punct('{') => depth += 1,
            Token::Punct('}') => depth = depth.saturating_sub(1),
            _ => {}
        }

        // layout (location = N)
        if depth == 0 && ident(&tokens, i) == Some("layout") {
            let mut j = i + 1;
            while j < tokens.len() && !punct(&tokens, j, ')') {
                if ident(&tokens, j) == Some("location") && punct(&tokens, j + 1, '=') {
                    if let Some(Token::Number(n)) = tokens.get(j + 2).map(|t| &t.token) {
                        pending_location = n.parse().ok();
                    }
                }
                j += 1;
            }
            i = j + 1;
            continue;
        }

        // in/out/uniform TYPE NAME ;
        if depth == 0 {
            let qualifier = ident(&tokens, i).filter(|q| ["in", "out", "uniform"].contains(q));
            if let Some(qualifier) = qualifier {
                if let (Some(ty), Some(name)) = (ident(&tokens, i + 1), ident(&tokens, i + 2)) {
                    if !TYPES.contains(&ty) {
                        return Err(error(tokens[i + 1].line, &format!("syntax error, unexpected IDENTIFIER '{}'", ty)));
                    }
                    match qualifier {
                        "in" => interface.inputs.push((pending_location.take(), ty.to_string(), name.to_string())),
                        "out" => interface.outputs.push((ty.to_string(), name.to_string())),
                        _ => {}
                    }
                    declared.push(name.to_string());
                    i += 3;
                    continue;
                }
            }
        }

        // Local declarations: TYPE NAME
        if let (Some(ty), Some(name)) = (ident(&tokens, i), ident(&tokens, i + 1)) {
            if TYPES.contains(&ty) && name != "main" {
                declared.push(name.to_string());
                i += 2;
                continue;
            }
        }

        if depth > 0 {
            if let Some(name) = ident(&tokens, i) {
                let is_member = i > 0 && punct(&tokens, i - 1, '.');
                if !is_member {
                    check_identifier(kind, name, &declared, &tokens, i)?;
                }
                if name == "gl_Position" && punct(&tokens, i + 1, '=') && !punct(&tokens, i + 2, '=') {
                    interface.writes_position = true;
                }
                if kind == gl::FRAGMENT_SHADER && !is_member {
                    if let Some(color) = constant_assignment(&tokens, i) {
                        if interface.outputs.iter().any(|(ty, out)| ty == "vec4" && out == name) {
                            interface.constant_color = Some(color);
                        }
                    }
                }
            }
        }

        i += 1;
    }

    Ok(interface)
}

fn check_identifier(kind: GLenum, name: &str, declared: &[String], tokens: &[Spanned], i: usize) -> Result<(), String> {
    let line = tokens[i].line;
    if name.starts_with("gl_") {
        let builtins = if kind == gl::VERTEX_SHADER { VERTEX_BUILTINS } else { FRAGMENT_BUILTINS };
        if builtins.contains(&name) {
            return Ok(());
        }
        return Err(error(line, &format!("`{}' undeclared", name)));
    }
    if TYPES.contains(&name) || KEYWORDS.contains(&name) || declared.iter().any(|d| d == name) {
        return Ok(());
    }
    if punct(tokens, i + 1, '(') {
        if FUNCTIONS.contains(&name) {
            return Ok(());
        }
        return Err(error(line, &format!("no function with name '{}'", name)));
    }
    Err(error(line, &format!("`{}' undeclared", name)))
}

/// Matches `NAME = vec4(a, b, c, d)` starting at `i`.
fn constant_assignment(tokens: &[Spanned], i: usize) -> Option<[f32; 4]> {
    if !punct(tokens, i + 1, '=') || punct(tokens, i + 2, '=') || ident(tokens, i + 2) != Some("vec4") || !punct(tokens, i + 3, '(') {
        return None;
    }
    let mut values = [0.0f32; 4];
    let mut j = i + 4;
    for (n, value) in values.iter_mut().enumerate() {
        let negative = punct(tokens, j, '-');
        if negative {
            j += 1;
        }
        let number = match tokens.get(j).map(|t| &t.token) {
            Some(Token::Number(text)) => parse_number(text)?,
            _ => return None,
        };
        *value = if negative { -number } else { number };
        j += 1;
        let separator = if n == 3 { ')' } else { ',' };
        if !punct(tokens, j, separator) {
            return None;
        }
        j += 1;
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn accepts_the_bundled_shaders() {
        let vertex = check(gl::VERTEX_SHADER, VERTEX_SHADER).unwrap();
        assert!(vertex.writes_position);
        assert_eq!(vertex.position_slot(), Some(0));

        let fragment = check(gl::FRAGMENT_SHADER, FRAGMENT_SHADER).unwrap();
        assert_eq!(fragment.constant_color, Some([0.8, 0.3, 0.02, 1.0]));
    }

    #[test]
    fn flags_misspelled_builtins_and_inputs() {
        let source = "#version 330 core\n\
                      layout (location = 0) in vec3 apos;\n\
                      void main()\n{\n\tgl_position = vec4(aPos.x, aPos.y, aPos.z, 1.0);\n}\0";
        let log = check(gl::VERTEX_SHADER, source).unwrap_err();
        assert!(log.contains("gl_position"), "{}", log);
        assert!(log.starts_with("0:5(1): error:"), "{}", log);
    }

    #[test]
    fn flags_unbalanced_braces() {
        let log = check(gl::VERTEX_SHADER, "#version 330 core\nvoid main() {\n").unwrap_err();
        assert!(log.contains("unexpected end of file"), "{}", log);
    }

    #[test]
    fn version_must_come_first() {
        let log = check(gl::FRAGMENT_SHADER, "out vec4 c;\n#version 330 core\nvoid main() {}\n").unwrap_err();
        assert!(log.contains("#version"), "{}", log);
    }

    #[test]
    fn stage_builtins_are_not_shared() {
        let source = "#version 330 core\nvoid main() { gl_Position = vec4(0.0, 0.0, 0.0, 1.0); }\n";
        assert!(check(gl::FRAGMENT_SHADER, source).is_err());
        assert!(check(gl::VERTEX_SHADER, source).is_ok());
    }

    #[test]
    fn comments_are_ignored() {
        let source = "#version 330 core\n// a comment\nout vec4 c; /* block */\nvoid main() { c = vec4(1, 0, -0.5, 1.0f); }\n";
        let interface = check(gl::FRAGMENT_SHADER, source).unwrap();
        assert_eq!(interface.constant_color, Some([1.0, 0.0, -0.5, 1.0]));
    }
}
