use serde::Serialize;

const NODE_SEPARATOR: char = '(';
const SCOPE_END: char = ')';
const ROOT_MARKER: &str = "#0";
const IPP_FUNCTION_MARKER: &str = "#3";
const NAME_DELIMITER: &str = " - ";
const IPP_FUNCTION_PREFIX: &str = "ipp";
const INDENT: &str = "    ";

const MARKER_LABELS: [(&str, &str); 5] = [
    ("#0", ""),
    ("#2", "[W_IPP] "),
    ("#3", "[F_IPP] "),
    ("#4", "[FPS_IPP] "),
    ("#5", "[FPC_IPP] "),
];

/// Decoded `functions_hierarchy` attribute: a profiled call tree where nodes
/// are separated by `(` and every `)` closes one enclosing scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallTree {
    lines: Vec<String>,
    has_ipp_node: bool,
    ipp_functions: Vec<String>,
    first_function: Option<String>,
}

impl CallTree {
    pub fn decode(encoded: &str) -> Self {
        let mut tree = CallTree::default();
        let mut depth: isize = 0;

        for token in encoded.split(NODE_SEPARATOR) {
            depth -= token.matches(SCOPE_END).count() as isize;
            let node = token.replace(SCOPE_END, "");

            if tree.first_function.is_none() {
                match name_after_marker(&node, ROOT_MARKER) {
                    Some(name) if !name.is_empty() => tree.first_function = Some(name.to_string()),
                    _ => (),
                }
            }

            if let Some(name) = name_after_marker(&node, IPP_FUNCTION_MARKER) {
                tree.has_ipp_node = true;
                if name.starts_with(IPP_FUNCTION_PREFIX)
                    && !tree.ipp_functions.iter().any(|f| f == name)
                {
                    tree.ipp_functions.push(name.to_string());
                }
            }

            let labelled = MARKER_LABELS
                .iter()
                .fold(node, |node, (marker, label)| node.replace(marker, label));
            let indent = INDENT.repeat(depth.max(0) as usize);
            tree.lines.push(format!("{indent}{labelled}"));

            depth += 1;
        }

        tree
    }

    /// Indented display lines, one per node.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_ipp_node(&self) -> bool {
        self.has_ipp_node
    }

    /// Distinct IPP function names in the order they were first seen.
    pub fn ipp_functions(&self) -> &[String] {
        &self.ipp_functions
    }

    /// Name of the first node tagged as the profiling root. Root markers
    /// with no name after them are skipped.
    pub fn first_function(&self) -> Option<&str> {
        self.first_function.as_deref()
    }

    /// Every line followed by a newline.
    pub fn text(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

fn name_after_marker<'a>(node: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = node.split_once(marker)?;
    Some(match rest.find(NAME_DELIMITER) {
        Some(end) => &rest[..end],
        None => rest,
    })
}
