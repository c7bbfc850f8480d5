//! Intermediate-source generation from parsed markup
//!
//! Lowers a markup node tree into one component class in the intermediate
//! language. The rendered output is rebuilt at invocation time from a `+`
//! concatenation chain: literal markup collapses into string literals,
//! `@ident` holes become parameter references, and `@(expr)` holes pass the
//! embedded expression through parenthesized.

use crate::ast::Node;

/// Generate a component class whose `Run` method renders the node tree.
pub fn generate_component(nodes: &[Node], class_name: &str, base: &str) -> String {
    let mut segments = Vec::new();
    let mut literal = String::new();
    render_nodes(nodes, &mut literal, &mut segments);
    flush_literal(&mut literal, &mut segments);

    if segments.is_empty() {
        segments.push("\"\"".to_string());
    }
    // Anchor the chain on a string literal so concatenation stays
    // string-typed even when the template starts with an int hole.
    if !segments[0].starts_with('"') {
        segments.insert(0, "\"\"".to_string());
    }
    let body = segments.join(" + ");

    format!(
        "public class {} : {} {{\n    public string Run(string name, int count) {{\n        return {};\n    }}\n}}\n",
        class_name, base, body
    )
}

fn render_nodes(nodes: &[Node], literal: &mut String, segments: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Text(text) => literal.push_str(text),
            Node::Interpolation(name) => {
                flush_literal(literal, segments);
                segments.push(name.clone());
            }
            Node::Expression(expr) => {
                flush_literal(literal, segments);
                segments.push(format!("({})", expr.trim()));
            }
            Node::Element {
                name,
                attributes,
                children,
                self_closing,
            } => {
                literal.push('<');
                literal.push_str(name);
                for attr in attributes {
                    literal.push(' ');
                    literal.push_str(&attr.name);
                    literal.push_str("=\"");
                    literal.push_str(&attr.value);
                    literal.push('"');
                }
                if *self_closing {
                    literal.push_str("/>");
                } else {
                    literal.push('>');
                    render_nodes(children, literal, segments);
                    literal.push_str("</");
                    literal.push_str(name);
                    literal.push('>');
                }
            }
        }
    }
}

fn flush_literal(literal: &mut String, segments: &mut Vec<String>) {
    if literal.is_empty() {
        return;
    }
    segments.push(format!("\"{}\"", escape(literal)));
    literal.clear();
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_markup;

    fn generate(source: &str) -> String {
        let nodes = parse_markup(source).nodes.expect("markup should parse");
        generate_component(&nodes, "TemplateView", "Component")
    }

    #[test]
    fn test_literal_only() {
        let code = generate("plain text");
        assert!(code.contains("return \"plain text\";"));
        assert!(code.contains("public class TemplateView : Component"));
    }

    #[test]
    fn test_interpolation_chain() {
        let code = generate("<h1>hi @name</h1>");
        assert!(code.contains("return \"<h1>hi \" + name + \"</h1>\";"));
    }

    #[test]
    fn test_leading_hole_gets_string_anchor() {
        let code = generate("@count items");
        assert!(code.contains("return \"\" + count + \" items\";"));
    }

    #[test]
    fn test_expression_hole() {
        let code = generate("@(count + 1)");
        assert!(code.contains("return \"\" + (count + 1);"));
    }

    #[test]
    fn test_escaping_and_self_closing() {
        let code = generate("say \"hi\"<br/>");
        assert!(code.contains("return \"say \\\"hi\\\"<br/>\";"));
    }
}
