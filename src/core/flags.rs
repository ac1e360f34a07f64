//! Parsing of shell-like compiler and linker flag strings.

use crate::core::candidate::ModuleCandidate;

/// Split a flag string into words.
///
/// Single quotes preserve their contents literally; double quotes allow
/// backslash escapes of `"` and `\`. Returns `None` on an unterminated
/// quote.
pub fn split_words(input: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        ch => current.push(ch),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            ch @ ('"' | '\\' | '$' | '`') => current.push(ch),
                            ch => {
                                current.push('\\');
                                current.push(ch);
                            }
                        },
                        ch => current.push(ch),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(ch) = chars.next() {
                    current.push(ch);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Some(words)
}

/// One parsed compiler flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileFlag {
    Include(String),
    Define(String, Option<String>),
    Undefine(String),
    Other(String),
}

/// One parsed linker flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFlag {
    LibraryDir(String),
    Library(String),
    Object(String),
    Other(String),
}

const OBJECT_SUFFIXES: &[&str] = &[".a", ".o", ".so", ".sl", ".dylib"];

pub fn parse_compile_flag(token: &str) -> CompileFlag {
    if let Some(dir) = token.strip_prefix("-I") {
        CompileFlag::Include(dir.to_string())
    } else if let Some(def) = token.strip_prefix("-D") {
        match def.split_once('=') {
            Some((name, value)) if !value.is_empty() => {
                CompileFlag::Define(name.to_string(), Some(value.to_string()))
            }
            Some((name, _)) => CompileFlag::Define(name.to_string(), None),
            None => CompileFlag::Define(def.to_string(), None),
        }
    } else if let Some(name) = token.strip_prefix("-U") {
        CompileFlag::Undefine(name.to_string())
    } else {
        CompileFlag::Other(token.to_string())
    }
}

pub fn parse_link_flag(token: &str) -> LinkFlag {
    if let Some(dir) = token.strip_prefix("-L") {
        LinkFlag::LibraryDir(dir.to_string())
    } else if let Some(lib) = token.strip_prefix("-l") {
        LinkFlag::Library(lib.to_string())
    } else if !token.starts_with('-') && OBJECT_SUFFIXES.iter().any(|s| token.ends_with(s)) {
        LinkFlag::Object(token.to_string())
    } else {
        LinkFlag::Other(token.to_string())
    }
}

/// Merge parsed compiler flags into a candidate.
pub fn apply_compile_flags(candidate: &mut ModuleCandidate, tokens: &[String]) {
    for token in tokens {
        match parse_compile_flag(token) {
            CompileFlag::Include(dir) => candidate.include_dirs.push(dir),
            CompileFlag::Define(name, value) => candidate.macros.push((name, value)),
            CompileFlag::Undefine(name) => candidate.undef_macros.push(name),
            CompileFlag::Other(arg) => candidate.extra_compile_args.push(arg),
        }
    }
}

/// Merge parsed linker flags into a candidate.
pub fn apply_link_flags(candidate: &mut ModuleCandidate, tokens: &[String]) {
    for token in tokens {
        match parse_link_flag(token) {
            LinkFlag::LibraryDir(dir) => candidate.library_dirs.push(dir),
            LinkFlag::Library(lib) => candidate.libraries.push(lib),
            LinkFlag::Object(obj) => candidate.extra_objects.push(obj),
            LinkFlag::Other(arg) => candidate.extra_link_args.push(arg),
        }
    }
}

/// Split a string on a repeated flag prefix, e.g. `"-I/a -I/b"` on `-I`
/// gives `["/a", "/b"]`.
///
/// Only occurrences preceded by whitespace (or at the start) count.
pub fn split_on_flag(value: &str, flag: &str) -> Vec<String> {
    let value = format!(" {}", value);
    let sep = format!(" {}", flag);
    value
        .split(sep.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
