/// Compiles a CSS selector once and hands out a `&'static Selector`.
#[macro_export]
macro_rules! selector {
    ($e: literal) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static SELECTOR: Lazy<Selector> =
            Lazy::new(|| Selector::parse($e).expect(concat!("Invalid selector: ", $e)));
        &*SELECTOR
    }};
}

/// Compiles a regular expression once and hands out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($e: literal) => {{
        use ::once_cell::sync::Lazy;
        use ::regex::Regex;
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new($e).expect(concat!("Invalid pattern: ", $e)));
        &*PATTERN
    }};
}
