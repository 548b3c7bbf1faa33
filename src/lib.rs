//! # Simple Press
//!
//! A small static site generator for personal blogs and documentation sites.
//! Markdown, HTML, and JSON files under the input directory become pages;
//! front matter and directory data decide titles, layouts, tags, and URLs.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      src/       →  Manifest      (templates, data cascade, assets)
//! 2. Resolve   front matter →  effective permalink + collection exclusion
//! 3. Route     Manifest   →  Pages         (URLs, output paths)
//! 4. Index     Pages      →  collections, navigation tree
//! 5. Render    Pages      →  HTML / JSON   (parallel, in memory)
//! 6. Write     dist/      ←  pages, passthrough copies, compiled assets
//! ```
//!
//! `check` runs steps 1 to 5. `build` runs all six. `watch` and `serve`
//! repeat `build` on every change.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`mode`] | Run modes and the per-process [`mode::BuildContext`] (draft switch) |
//! | [`drafts`] | Effective permalink and collection exclusion for drafts |
//! | [`gate`] | Ready gate: run callbacks once the first build is done |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`scan`] | Walks the input directory, applies the data cascade |
//! | [`front_matter`] | YAML front matter parsing and data merging |
//! | [`naming`] | `YYYY-MM-DD-slug` filename parser |
//! | [`site`] | Routing and the build orchestration |
//! | [`collections`] | Tag, `all`, and configured glob collections |
//! | [`navigation`] | `eleventyNavigation` tree and breadcrumbs |
//! | [`template`] | `{{ value \| filter }}` and `{% shortcode %}` templates |
//! | [`render`] | Markdown, layouts, and the built-in Maud layouts |
//! | [`assets`] | Stylesheet and script compilation through external tools |
//! | [`exec`] | External command runner |
//! | [`passthrough`] | Verbatim file copy into the output directory |
//! | [`watch`] | Debounced rebuild on change |
//! | [`serve`] | Development HTTP server |
//! | [`readme`] | Import the project README as a page |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Drafts Follow the Run Mode
//!
//! A page with `draft: true` is published by `watch` and `serve` and left out
//! of `build`. Hidden drafts get no output file and never appear in
//! collections or navigation. The decision is made once per process, in
//! `main`, and travels through every build as
//! [`mode::BuildContext::drafts_enabled`]; nothing reads the environment
//! later.
//!
//! ## Render Before Write
//!
//! All pages render in memory before the output directory is touched. A
//! template error therefore leaves the previous build in place, which keeps
//! `serve` usable while a page is broken.
//!
//! ## Built-in Layouts in Maud
//!
//! The `base` and `post` layouts are compiled in with
//! [Maud](https://maud.lambda.xyz/), so a site with no `_includes` directory
//! still renders complete pages. A file in `_includes` with the same name
//! replaces the built-in one.

pub mod assets;
pub mod collections;
pub mod config;
pub mod drafts;
pub mod exec;
pub mod front_matter;
pub mod gate;
pub mod mode;
pub mod naming;
pub mod navigation;
pub mod output;
pub mod passthrough;
pub mod readme;
pub mod render;
pub mod scan;
pub mod serve;
pub mod site;
pub mod template;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
