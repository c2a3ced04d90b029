//! Parser for `.nexus` declaration files
//!
//! Hand-written `nom` combinators producing the syntax tree in [`super`].
//! No name resolution happens here; `gns.Gns` stays a qualified name until
//! the graph builder resolves it against the file's imports.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, satisfy},
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value},
    error::{context, convert_error, VerboseError},
    multi::{many0, many0_count, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{
    Annotation, Field, Import, Item, QueryDecl, QuerySpecDecl, Record, RecordKind, SourceFile,
    TypeExpr,
};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete `.nexus` file
///
/// On failure the error string is a human-readable trace pointing at the
/// offending line.
pub fn parse_file(input: &str) -> Result<SourceFile, String> {
    match all_consuming(terminated(source_file, sp))(input) {
        Ok((_, file)) => Ok(file),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn comment(input: &str) -> PResult<'_, ()> {
    value((), pair(tag("//"), take_while(|c| c != '\n')))(input)
}

/// Whitespace and line comments
fn sp(input: &str) -> PResult<'_, ()> {
    value((), many0_count(alt((value((), multispace1), comment))))(input)
}

fn lexeme<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    preceded(sp, inner)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(sp, terminated(tag(kw), not(satisfy(is_ident_char))))
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    preceded(sp, char(c))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Annotation keys may contain dashes (`nexus-graphql`)
fn annotation_key(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alpha1,
        many0_count(alt((alphanumeric1, tag("-"), tag("_")))),
    ))(input)
}

fn string_lit(input: &str) -> PResult<'_, &str> {
    delimited(char('"'), take_while(|c| c != '"' && c != '\n'), cut(char('"')))(input)
}

// ============================================================================
// File structure
// ============================================================================

fn source_file(input: &str) -> PResult<'_, SourceFile> {
    let (input, package) = package_decl(input)?;
    let (input, imports) = many0(import_decl)(input)?;
    let (input, items) = many0(item)(input)?;
    Ok((
        input,
        SourceFile {
            package: package.to_string(),
            imports,
            items,
        },
    ))
}

fn package_decl(input: &str) -> PResult<'_, &str> {
    context(
        "package declaration",
        preceded(
            keyword("package"),
            cut(terminated(lexeme(identifier), symbol(';'))),
        ),
    )(input)
}

fn import_decl(input: &str) -> PResult<'_, Import> {
    let (input, _) = keyword("import")(input)?;
    let (input, (alias, path, _)) = cut(context(
        "import",
        tuple((opt(lexeme(identifier)), lexeme(string_lit), symbol(';'))),
    ))(input)?;
    Ok((
        input,
        Import {
            alias: alias.map(String::from),
            path: path.to_string(),
        },
    ))
}

fn item(input: &str) -> PResult<'_, Item> {
    alt((
        map(query_spec, Item::QuerySpec),
        map(record, Item::Record),
    ))(input)
}

// ============================================================================
// Records
// ============================================================================

fn attribute(input: &str) -> PResult<'_, Annotation> {
    let (input, _) = lexeme(tag("#["))(input)?;
    let (input, (key, val, _)) = cut(context(
        "attribute",
        tuple((
            lexeme(annotation_key),
            opt(preceded(symbol('='), lexeme(string_lit))),
            symbol(']'),
        )),
    ))(input)?;
    Ok((input, Annotation::new(key, val)))
}

fn record_kind(input: &str) -> PResult<'_, RecordKind> {
    alt((
        value(
            RecordKind::SingletonNode,
            pair(keyword("singleton"), cut(keyword("node"))),
        ),
        value(RecordKind::Node, keyword("node")),
        value(RecordKind::Plain, keyword("type")),
    ))(input)
}

fn record(input: &str) -> PResult<'_, Record> {
    let (input, attributes) = many0(attribute)(input)?;
    let (input, kind) = context("declaration", record_kind)(input)?;
    let (input, name) = cut(context("type name", lexeme(identifier)))(input)?;
    let (input, _) = cut(context("opening brace", symbol('{')))(input)?;
    let (input, fields) = many0(field)(input)?;
    let (input, _) = cut(context("closing brace", symbol('}')))(input)?;
    Ok((
        input,
        Record {
            name: name.to_string(),
            kind,
            attributes,
            fields,
        },
    ))
}

fn field(input: &str) -> PResult<'_, Field> {
    let (input, name) = lexeme(identifier)(input)?;
    let (input, _) = symbol(':')(input)?;
    let (input, ty) = cut(context("field type", type_expr))(input)?;
    let (input, annotations) = opt(annotations)(input)?;
    let (input, _) = cut(context("semicolon", symbol(';')))(input)?;
    Ok((
        input,
        Field {
            name: name.to_string(),
            ty,
            annotations: annotations.unwrap_or_default(),
        },
    ))
}

fn annotations(input: &str) -> PResult<'_, Vec<Annotation>> {
    delimited(
        symbol('['),
        separated_list1(symbol(','), annotation),
        pair(opt(symbol(',')), cut(symbol(']'))),
    )(input)
}

fn annotation(input: &str) -> PResult<'_, Annotation> {
    let (input, key) = lexeme(annotation_key)(input)?;
    let (input, val) = opt(preceded(symbol('='), cut(lexeme(string_lit))))(input)?;
    Ok((input, Annotation::new(key, val)))
}

fn type_expr(input: &str) -> PResult<'_, TypeExpr> {
    preceded(
        sp,
        alt((
            map(preceded(tag("[]"), type_expr), |t| TypeExpr::Array(Box::new(t))),
            map(preceded(char('*'), type_expr), |t| {
                TypeExpr::Pointer(Box::new(t))
            }),
            map(
                pair(
                    preceded(pair(keyword("map"), symbol('[')), type_expr),
                    preceded(symbol(']'), type_expr),
                ),
                |(k, v)| TypeExpr::Map(Box::new(k), Box::new(v)),
            ),
            named_type,
        )),
    )(input)
}

fn named_type(input: &str) -> PResult<'_, TypeExpr> {
    let (input, (first, second)) =
        pair(identifier, opt(preceded(char('.'), identifier)))(input)?;
    let ty = match second {
        Some(name) => TypeExpr::qualified(first, name),
        None => TypeExpr::named(first),
    };
    Ok((input, ty))
}

// ============================================================================
// Query specs
// ============================================================================

#[derive(Debug, Clone)]
enum QueryEntry<'a> {
    Domain(&'a str),
    Port(u16),
    Args(&'a str),
    Api(&'a str),
}

fn query_spec(input: &str) -> PResult<'_, QuerySpecDecl> {
    let (input, _) = keyword("queryspec")(input)?;
    let (input, name) = cut(context("query spec name", lexeme(identifier)))(input)?;
    let (input, _) = cut(symbol('{'))(input)?;
    let (input, queries) = many0(query)(input)?;
    let (input, _) = cut(context("closing brace", symbol('}')))(input)?;
    Ok((
        input,
        QuerySpecDecl {
            name: name.to_string(),
            queries,
        },
    ))
}

fn query(input: &str) -> PResult<'_, QueryDecl> {
    let (input, _) = keyword("query")(input)?;
    let (input, name) = cut(context("query name", lexeme(string_lit)))(input)?;
    let (input, _) = cut(symbol('{'))(input)?;
    let (input, entries) = many0(query_entry)(input)?;
    let (input, _) = cut(context("closing brace", symbol('}')))(input)?;

    let mut decl = QueryDecl {
        name: name.to_string(),
        ..Default::default()
    };
    for entry in entries {
        match entry {
            QueryEntry::Domain(d) => decl.domain = Some(d.to_string()),
            QueryEntry::Port(p) => decl.port = Some(p),
            QueryEntry::Args(a) => decl.args = Some(a.to_string()),
            QueryEntry::Api(a) => decl.api = Some(a.to_string()),
        }
    }
    Ok((input, decl))
}

fn query_entry(input: &str) -> PResult<'_, QueryEntry<'_>> {
    terminated(
        alt((
            map(
                preceded(pair(keyword("domain"), cut(symbol('='))), cut(lexeme(string_lit))),
                QueryEntry::Domain,
            ),
            map(
                preceded(
                    pair(keyword("port"), cut(symbol('='))),
                    cut(map_res(lexeme(digit1), |s: &str| s.parse::<u16>())),
                ),
                QueryEntry::Port,
            ),
            map(
                preceded(pair(keyword("args"), cut(symbol('='))), cut(lexeme(identifier))),
                QueryEntry::Args,
            ),
            map(
                preceded(pair(keyword("api"), cut(symbol('='))), cut(lexeme(identifier))),
                QueryEntry::Api,
            ),
        )),
        cut(context("semicolon", symbol(';'))),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        // Config lives under the root
        package config;

        import "example.com/datamodel/config/gns";
        import py "example.com/datamodel/config/policy";

        #[query = "root.GeneralQuerySpec"]
        node Config {
            GNS: gns.Gns [nexus = "child"];
            ACPPolicies: py.AccessControlPolicy [nexus = "links"];
            Ports: []string;
            Hosts: map[string]*gns.Host;
            Secret: string [json = "secret", nexus-graphql = "ignore:true",];
        }

        type ClusterNamespace {
            Cluster: string;
        }
    "#;

    #[test]
    fn test_parse_package_and_imports() {
        let file = parse_file(CONFIG).unwrap();
        assert_eq!(file.package, "config");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].alias, None);
        assert_eq!(file.imports[0].last_segment(), "gns");
        assert_eq!(file.imports[1].alias.as_deref(), Some("py"));
    }

    #[test]
    fn test_parse_node_fields() {
        let file = parse_file(CONFIG).unwrap();
        let Item::Record(config) = &file.items[0] else {
            panic!("expected record");
        };
        assert_eq!(config.kind, RecordKind::Node);
        assert_eq!(config.attribute("query"), Some("root.GeneralQuerySpec"));
        assert_eq!(config.fields.len(), 5);

        assert_eq!(config.fields[0].ty, TypeExpr::qualified("gns", "Gns"));
        assert_eq!(config.fields[0].annotation_value("nexus"), Some("child"));
        assert_eq!(config.fields[2].ty.to_string(), "[]string");
        assert_eq!(config.fields[3].ty.to_string(), "map[string]*gns.Host");

        let secret = &config.fields[4];
        assert_eq!(secret.annotations.len(), 2);
        assert_eq!(secret.annotation_value("nexus-graphql"), Some("ignore:true"));
    }

    #[test]
    fn test_parse_plain_type_and_singleton() {
        let file = parse_file(
            "package root; singleton node Root { Config: Config [nexus = \"child\"]; } type T {}",
        )
        .unwrap();
        assert_eq!(file.items.len(), 2);
        match &file.items[0] {
            Item::Record(r) => assert_eq!(r.kind, RecordKind::SingletonNode),
            other => panic!("unexpected {:?}", other),
        }
        match &file.items[1] {
            Item::Record(r) => {
                assert_eq!(r.kind, RecordKind::Plain);
                assert!(r.fields.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_annotation_value() {
        let file = parse_file("package a; node A { X: int [json = \"\", omitempty]; }").unwrap();
        let Item::Record(a) = &file.items[0] else {
            panic!("expected record");
        };
        assert_eq!(a.fields[0].annotation_value("json"), Some(""));
        assert_eq!(a.fields[0].annotation("omitempty").unwrap().value, None);
    }

    #[test]
    fn test_parse_query_spec() {
        let src = r#"
            package root;
            queryspec GeneralQuerySpec {
                query "queryExample" {
                    domain = "query-responder";
                    port = 15000;
                    args = QueryFilters;
                    api = graphql;
                }
                query "metrics" { api = metrics; }
            }
        "#;
        let file = parse_file(src).unwrap();
        let Item::QuerySpec(spec) = &file.items[0] else {
            panic!("expected query spec");
        };
        assert_eq!(spec.name, "GeneralQuerySpec");
        assert_eq!(spec.queries.len(), 2);
        assert_eq!(spec.queries[0].port, Some(15000));
        assert_eq!(spec.queries[0].args.as_deref(), Some("QueryFilters"));
        assert_eq!(spec.queries[1].api.as_deref(), Some("metrics"));
        assert_eq!(spec.queries[1].domain, None);
    }

    #[test]
    fn test_keyword_prefix_is_an_identifier() {
        let file = parse_file("package a; node A { mapping: mapping; nodes: nodeset; }").unwrap();
        let Item::Record(a) = &file.items[0] else {
            panic!("expected record");
        };
        assert_eq!(a.fields[0].ty, TypeExpr::named("mapping"));
        assert_eq!(a.fields[1].name, "nodes");
    }

    #[test]
    fn test_missing_semicolon_is_reported() {
        let err = parse_file("package a; node A { X: int }").unwrap_err();
        assert!(err.contains("semicolon"), "{}", err);
    }

    #[test]
    fn test_missing_package_is_reported() {
        assert!(parse_file("node A {}").is_err());
    }
}
