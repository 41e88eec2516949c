// Type-name normalization.
//
// Containers name their readers with assembly-qualified .NET type names:
//
//   Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib, ...],[System.Int32, mscorlib, ...]]
//
// `simplify_type` reduces such a name to a short tag (`Dictionary<String,Int32>`)
// which `TypeReader::from_tag` turns into a reader.

use super::resolver::MAX_NESTING;
use crate::error::{Result, XnbError};

const CONTENT_NS: &str = "Microsoft.Xna.Framework.Content.";

/// Reduce a full type name to its tag, e.g. `System.Int32[]` to `Array<Int32>`.
pub fn simplify_type(type_name: &str) -> Result<String> {
    simplify_at(type_name, 0)
}

fn simplify_at(type_name: &str, depth: usize) -> Result<String> {
    if depth > MAX_NESTING {
        return Err(XnbError::UnknownType(format!(
            "type name nested more than {MAX_NESTING} deep"
        )));
    }
    let simple = type_name
        .split(['`', ','])
        .next()
        .unwrap_or_default()
        .trim();

    if let Some(element) = simple.strip_suffix("[]") {
        return Ok(format!("Array<{}>", simplify_at(element, depth + 1)?));
    }

    let leaf = match simple {
        "System.Boolean" => "Boolean",
        "System.Char" => "Char",
        "System.Int32" => "Int32",
        "System.UInt32" => "UInt32",
        "System.Single" => "Single",
        "System.Double" => "Double",
        "System.String" => "String",
        "Microsoft.Xna.Framework.Vector2" => "Vector2",
        "Microsoft.Xna.Framework.Vector3" => "Vector3",
        "Microsoft.Xna.Framework.Vector4" => "Vector4",
        "Microsoft.Xna.Framework.Rectangle" => "Rectangle",
        "Microsoft.Xna.Framework.Graphics.Texture2D" => "Texture2D",
        "Microsoft.Xna.Framework.Graphics.Effect" => "Effect",
        "Microsoft.Xna.Framework.Audio.SoundEffect" => "SoundEffect",
        "xTile.Pipeline.TideReader" => "TBin",
        "BmFont.XmlSourceReader" => "BmFont",
        "System.Collections.Generic.List" => return generic(type_name, "List", 1, depth),
        "System.Collections.Generic.Dictionary" => return generic(type_name, "Dictionary", 2, depth),
        "System.Nullable" => return generic(type_name, "Nullable", 1, depth),
        _ => match simple.strip_prefix(CONTENT_NS).and_then(|r| r.strip_suffix("Reader")) {
            Some(
                leaf @ ("Boolean" | "Char" | "Int32" | "UInt32" | "Single" | "Double"
                | "String" | "Vector2" | "Vector3" | "Vector4" | "Rectangle" | "Texture2D"
                | "SpriteFont" | "Effect" | "SoundEffect"),
            ) => leaf,
            Some(kind @ ("Array" | "List" | "Nullable")) => return generic(type_name, kind, 1, depth),
            Some("Dictionary") => return generic(type_name, "Dictionary", 2, depth),
            _ => {
                return Err(XnbError::UnknownType(format!(
                    "cannot resolve \"{simple}\" (from \"{type_name}\")"
                )));
            }
        },
    };
    Ok(leaf.to_string())
}

/// Build `Kind<A,B,..>` from the generic arguments of `type_name`.
fn generic(type_name: &str, kind: &str, arity: usize, depth: usize) -> Result<String> {
    let args = parse_subtypes(type_name)?;
    if args.len() != arity {
        return Err(XnbError::UnknownType(format!(
            "{kind} expects {arity} type argument(s), found {} in \"{type_name}\"",
            args.len()
        )));
    }
    let args = args
        .iter()
        .map(|arg| simplify_at(arg, depth + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{kind}<{}>", args.join(",")))
}

/// Extract the generic arguments of a full type name.
///
/// `List`1[[System.Int32, mscorlib]]` yields `["System.Int32, mscorlib"]`;
/// the unqualified form `List`1[System.Int32]` yields `["System.Int32"]`.
pub fn parse_subtypes(type_name: &str) -> Result<Vec<String>> {
    let bad = || XnbError::UnknownType(format!("malformed generic type \"{type_name}\""));

    let (_, after_tick) = type_name.split_once('`').ok_or_else(bad)?;
    let open = after_tick.find('[').ok_or_else(bad)?;
    let close = matching_bracket(after_tick, open).ok_or_else(bad)?;
    let inner = &after_tick[open + 1..close];

    if !inner.trim_start().starts_with('[') {
        return Ok(split_top_level(inner, ',')
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect());
    }

    let mut args = Vec::new();
    let mut rest = inner;
    while let Some(start) = rest.find('[') {
        let end = matching_bracket(rest, start).ok_or_else(bad)?;
        args.push(rest[start + 1..end].trim().to_string());
        rest = &rest[end + 1..];
    }
    Ok(args)
}

/// Split a tag like `Dictionary<String,List<Int32>>` into its head and
/// top-level arguments: `("Dictionary", ["String", "List<Int32>"])`.
pub fn split_type_tag(tag: &str) -> Result<(&str, Vec<&str>)> {
    let Some(open) = tag.find('<') else {
        return Ok((tag.trim(), Vec::new()));
    };
    let inner = tag[open + 1..]
        .strip_suffix('>')
        .ok_or_else(|| XnbError::UnknownType(format!("unbalanced type tag \"{tag}\"")))?;
    let args = split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .collect();
    Ok((tag[..open].trim(), args))
}

/// Index of the bracket closing the one at `open`.
fn matching_bracket(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` where it is not nested inside `[]` or `<>`.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '<' => depth += 1,
            ']' | '>' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSCORLIB: &str =
        "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089";

    #[test]
    fn leaf_names() {
        assert_eq!(simplify_type("System.Int32").unwrap(), "Int32");
        assert_eq!(
            simplify_type("Microsoft.Xna.Framework.Content.StringReader").unwrap(),
            "String"
        );
        assert_eq!(
            simplify_type("Microsoft.Xna.Framework.Content.Texture2DReader, Microsoft.Xna.Framework.Graphics, Version=4.0.0.0").unwrap(),
            "Texture2D"
        );
        assert_eq!(simplify_type("xTile.Pipeline.TideReader, xTile").unwrap(), "TBin");
        assert_eq!(
            simplify_type("Microsoft.Xna.Framework.Content.SoundEffectReader").unwrap(),
            "SoundEffect"
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(simplify_type("System.Int32[]").unwrap(), "Array<Int32>");
        let name = format!("Microsoft.Xna.Framework.Content.ArrayReader`1[[System.Char, {MSCORLIB}]]");
        assert_eq!(simplify_type(&name).unwrap(), "Array<Char>");
    }

    #[test]
    fn nested_generics() {
        let name = format!(
            "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, {MSCORLIB}],\
             [System.Collections.Generic.List`1[[System.Int32, {MSCORLIB}]], {MSCORLIB}]]"
        );
        assert_eq!(
            simplify_type(&name).unwrap(),
            "Dictionary<String,List<Int32>>"
        );
    }

    #[test]
    fn unqualified_generic_arguments() {
        assert_eq!(
            parse_subtypes("System.Collections.Generic.Dictionary`2[System.String,System.Int32]")
                .unwrap(),
            vec!["System.String", "System.Int32"]
        );
        assert_eq!(
            simplify_type("System.Nullable`1[System.Char]").unwrap(),
            "Nullable<Char>"
        );
    }

    #[test]
    fn unknown_types_fail() {
        assert!(matches!(
            simplify_type("Game.Custom.WidgetReader"),
            Err(XnbError::UnknownType(_))
        ));
        assert!(matches!(
            simplify_type("Microsoft.Xna.Framework.Content.ListReader"),
            Err(XnbError::UnknownType(_))
        ));
    }

    #[test]
    fn deeply_nested_names_fail_cleanly() {
        let name = format!("System.Int32{}", "[]".repeat(20_000));
        assert!(matches!(simplify_type(&name), Err(XnbError::UnknownType(_))));

        let name = format!("System.Collections.Generic.List`1[{}]", name);
        assert!(matches!(simplify_type(&name), Err(XnbError::UnknownType(_))));

        let name = format!("System.Int32{}", "[]".repeat(MAX_NESTING));
        assert!(simplify_type(&name).unwrap().starts_with("Array<Array<"));
    }

    #[test]
    fn tags_split_at_top_level() {
        let (head, args) = split_type_tag("Dictionary<String,List<Int32>>").unwrap();
        assert_eq!(head, "Dictionary");
        assert_eq!(args, vec!["String", "List<Int32>"]);
        assert_eq!(split_type_tag("Int32").unwrap(), ("Int32", vec![]));
        assert!(split_type_tag("List<Int32").is_err());
    }
}
