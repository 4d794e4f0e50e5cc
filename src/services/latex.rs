//! LaTeX to text conversion
//!
//! arXiv titles and abstracts carry LaTeX markup. Common commands are
//! converted to Unicode; math segments ($...$, $$...$$, \(...\), \[...\],
//! equation/align environments) are preserved verbatim so the browser can
//! hand them to MathJax.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static MATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    // Display math first so $$...$$ is not eaten by the inline pattern
    vec![
        Regex::new(r"(?s)\$\$.+?\$\$").unwrap(),
        Regex::new(r"(?s)\\\[.+?\\\]").unwrap(),
        Regex::new(r"(?s)\\begin\{equation\}.+?\\end\{equation\}").unwrap(),
        Regex::new(r"(?s)\\begin\{align\*?\}.+?\\end\{align\*?\}").unwrap(),
        Regex::new(r"\$[^\$]+?\$").unwrap(),
        Regex::new(r"\\\(.+?\\\)").unwrap(),
    ]
});

static TEXT_COMMANDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\\textbf\{([^}]*)\}").unwrap(),
        Regex::new(r"\\textit\{([^}]*)\}").unwrap(),
        Regex::new(r"\\emph\{([^}]*)\}").unwrap(),
        Regex::new(r"\\textrm\{([^}]*)\}").unwrap(),
        Regex::new(r"\\text\{([^}]*)\}").unwrap(),
    ]
});

static REMAINING_COMMANDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+\s*").unwrap());

const GREEK: &[(&str, &str)] = &[
    (r"\alpha", "α"), (r"\beta", "β"), (r"\gamma", "γ"), (r"\delta", "δ"),
    (r"\epsilon", "ε"), (r"\zeta", "ζ"), (r"\eta", "η"), (r"\theta", "θ"),
    (r"\iota", "ι"), (r"\kappa", "κ"), (r"\lambda", "λ"), (r"\mu", "μ"),
    (r"\nu", "ν"), (r"\xi", "ξ"), (r"\pi", "π"), (r"\rho", "ρ"),
    (r"\sigma", "σ"), (r"\tau", "τ"), (r"\upsilon", "υ"), (r"\phi", "φ"),
    (r"\chi", "χ"), (r"\psi", "ψ"), (r"\omega", "ω"),
    (r"\Gamma", "Γ"), (r"\Delta", "Δ"), (r"\Theta", "Θ"), (r"\Lambda", "Λ"),
    (r"\Xi", "Ξ"), (r"\Pi", "Π"), (r"\Sigma", "Σ"), (r"\Phi", "Φ"),
    (r"\Psi", "Ψ"), (r"\Omega", "Ω"),
];

const SYMBOLS: &[(&str, &str)] = &[
    (r"\sim", "~"), (r"\approx", "≈"), (r"\neq", "≠"), (r"\leq", "≤"),
    (r"\geq", "≥"), (r"\pm", "±"), (r"\times", "×"), (r"\cdot", "·"),
    (r"\infty", "∞"), (r"\partial", "∂"), (r"\nabla", "∇"),
    (r"\sum", "∑"), (r"\prod", "∏"), (r"\int", "∫"),
    (r"\rightarrow", "→"), (r"\leftarrow", "←"), (r"\Rightarrow", "⇒"),
    (r"\degree", "°"), (r"\deg", "°"),
];

/// Convert LaTeX markup to readable text, preserving math for MathJax.
pub fn latex_to_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = WHITESPACE.replace_all(text, " ").into_owned();

    // Pull math segments out before touching anything else
    let mut math_blocks: Vec<String> = Vec::new();
    for pattern in MATH_PATTERNS.iter() {
        text = pattern
            .replace_all(&text, |caps: &regex::Captures| {
                math_blocks.push(caps[0].to_string());
                format!("MATHSEGMENT{}X", math_blocks.len() - 1)
            })
            .into_owned();
    }

    // Longer commands first so \Rightarrow is not clobbered by \rho etc.
    for (cmd, replacement) in SYMBOLS {
        text = text.replace(cmd, replacement);
    }
    for (cmd, replacement) in GREEK {
        text = text.replace(cmd, replacement);
    }

    for pattern in TEXT_COMMANDS.iter() {
        text = pattern.replace_all(&text, "$1").into_owned();
    }

    // Strip whatever commands are left, then the grouping braces
    text = REMAINING_COMMANDS.replace_all(&text, "").into_owned();
    text = text.replace(['{', '}'], "");

    // Restore math segments
    for (i, block) in math_blocks.iter().enumerate().rev() {
        text = text.replace(&format!("MATHSEGMENT{}X", i), block);
    }

    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

static MATH_DETECT: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\$[^\$]+\$").unwrap(),
        Regex::new(r"(?s)\$\$.+?\$\$").unwrap(),
        Regex::new(r"(?s)\\\(.+?\\\)").unwrap(),
        Regex::new(r"(?s)\\\[.+?\\\]").unwrap(),
        Regex::new(r"\\begin\{equation\}").unwrap(),
        Regex::new(r"\\begin\{align").unwrap(),
    ]
});

/// Check if text contains LaTeX math that needs MathJax rendering.
pub fn has_math(text: &str) -> bool {
    !text.is_empty() && MATH_DETECT.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greek_letters() {
        assert_eq!(
            latex_to_text(r"The \alpha particle and \Omega baryon"),
            "The α particle and Ω baryon"
        );
    }

    #[test]
    fn test_inline_math_preserved() {
        let result = latex_to_text(r"A halo of mass $M_{200} \sim 10^{12}$ solar masses");
        assert!(result.contains(r"$M_{200} \sim 10^{12}$"));
        assert!(result.starts_with("A halo of mass"));
    }

    #[test]
    fn test_display_math_preserved() {
        let result = latex_to_text(r"We solve $$\rho(r) = \rho_0 e^{-r}$$ numerically");
        assert!(result.contains(r"$$\rho(r) = \rho_0 e^{-r}$$"));
    }

    #[test]
    fn test_formatting_commands_unwrapped() {
        assert_eq!(latex_to_text(r"\textbf{bold} and \emph{emphasis}"), "bold and emphasis");
    }

    #[test]
    fn test_unknown_commands_stripped() {
        assert_eq!(latex_to_text(r"Title with \newcommand junk"), "Title with junk");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(latex_to_text("Line one\n  line   two"), "Line one line two");
    }

    #[test]
    fn test_many_math_segments() {
        // More than ten segments exercises the reverse-order restoration
        let input = (0..12)
            .map(|i| format!("$x_{{{}}}$", i))
            .collect::<Vec<_>>()
            .join(" and ");
        let result = latex_to_text(&input);
        assert!(result.contains("$x_{0}$"));
        assert!(result.contains("$x_{11}$"));
        assert!(!result.contains("MATHSEGMENT"));
    }

    #[test]
    fn test_has_math() {
        assert!(has_math(r"energy $E = mc^2$ density"));
        assert!(has_math(r"\begin{equation}x\end{equation}"));
        assert!(!has_math("no math here"));
        assert!(!has_math(""));
    }
}
