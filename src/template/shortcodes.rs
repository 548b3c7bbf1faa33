//! Built-in shortcodes and the HTML components behind them.
//!
//! | Shortcode | Output |
//! |-----------|--------|
//! | `{% year %}` | year of the build, e.g. `2026` |
//! | `{% navigation %}` | nested `<ul>` of the navigation tree |
//! | `{% breadcrumbs %}` / `{% breadcrumbs "key" %}` | ancestor trail of the current (or given) entry |
//! | `{% collection "posts" %}` | linked list of a collection, with dates |
//!
//! The components are also used by the built-in layouts.

use super::filters::POST_DATE_FORMAT;
use super::{Registry, to_text};
use crate::collections::Collections;
use crate::types::{NavItem, Page};
use chrono::Datelike;
use maud::{Markup, html};

pub(super) fn register(registry: &mut Registry) {
    registry.add_shortcode("year", |_, env| Ok(env.build_time.year().to_string()));
    registry.add_shortcode("navigation", |_, env| {
        Ok(render_nav(env.navigation.tree(), env.page_url).into_string())
    });
    registry.add_shortcode("breadcrumbs", |args, env| {
        let key = match args.first() {
            Some(value) => Some(to_text(value)),
            None => env.nav_key.map(String::from),
        };
        let trail = key
            .map(|k| env.navigation.breadcrumbs(&k, false))
            .unwrap_or_default();
        Ok(render_breadcrumbs(&trail).into_string())
    });
    registry.add_shortcode("collection", |args, env| {
        let name = args
            .first()
            .map(to_text)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "expected a collection name".to_string())?;
        if !env.collections.contains(&name) {
            return Err(format!("no collection named '{name}'"));
        }
        Ok(render_collection(env.pages, env.collections, &name).into_string())
    });
}

fn is_current(url: Option<&str>, current: Option<&str>) -> bool {
    matches!((url, current), (Some(u), Some(c)) if u == c)
}

/// Navigation tree as nested lists; the current page's item gets `current`.
pub fn render_nav(items: &[NavItem], current_url: Option<&str>) -> Markup {
    html! {
        @if !items.is_empty() {
            ul.nav {
                @for item in items {
                    (render_nav_item(item, current_url))
                }
            }
        }
    }
}

fn render_nav_item(item: &NavItem, current_url: Option<&str>) -> Markup {
    let current = is_current(item.url.as_deref(), current_url);
    html! {
        li class=[current.then_some("current")] {
            @if let Some(url) = &item.url {
                a href=(url) aria-current=[current.then_some("page")] { (item.title) }
            } @else {
                span.nav-group { (item.title) }
            }
            @if !item.children.is_empty() {
                ul {
                    @for child in &item.children {
                        (render_nav_item(child, current_url))
                    }
                }
            }
        }
    }
}

pub fn render_breadcrumbs(trail: &[NavItem]) -> Markup {
    html! {
        @if !trail.is_empty() {
            nav.breadcrumb aria-label="Breadcrumb" {
                @for (i, item) in trail.iter().enumerate() {
                    @if i > 0 { " › " }
                    @if let Some(url) = &item.url {
                        a href=(url) { (item.title) }
                    } @else {
                        (item.title)
                    }
                }
            }
        }
    }
}

/// A collection as a list of links, newest last.
pub fn render_collection(pages: &[Page], collections: &Collections, name: &str) -> Markup {
    html! {
        ul.collection data-collection=(name) {
            @for &idx in collections.get(name) {
                @let page = &pages[idx];
                li {
                    a href=[page.url.as_deref()] { (page.title()) }
                    @if let Some(date) = page.item.date {
                        " "
                        time datetime=(date.format("%Y-%m-%d").to_string()) {
                            (date.format(POST_DATE_FORMAT).to_string())
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateError;
    use crate::test_helpers::*;
    use serde_json::json;

    fn nav(key: &str, url: &str, children: Vec<NavItem>) -> NavItem {
        NavItem {
            key: key.to_string(),
            title: key.to_uppercase(),
            url: Some(url.to_string()),
            children,
        }
    }

    #[test]
    fn nav_renders_items() {
        let html = render_nav(&[nav("home", "/", vec![])], None).into_string();
        assert!(html.contains(r#"<a href="/">HOME</a>"#));
    }

    #[test]
    fn nav_empty_renders_nothing() {
        assert_eq!(render_nav(&[], None).into_string(), "");
    }

    #[test]
    fn nav_marks_current_item() {
        let items = vec![nav("a", "/a/", vec![]), nav("b", "/b/", vec![])];
        let html = render_nav(&items, Some("/b/")).into_string();
        assert!(html.contains(r#"<li class="current"><a href="/b/" aria-current="page">B</a>"#));
        assert_eq!(html.matches("current").count(), 2);
    }

    #[test]
    fn nav_renders_nested_children() {
        let items = vec![nav("docs", "/docs/", vec![nav("intro", "/docs/intro/", vec![])])];
        let html = render_nav(&items, None).into_string();
        assert!(html.contains("<ul><li><a href=\"/docs/intro/\">INTRO</a></li></ul>"));
    }

    #[test]
    fn breadcrumbs_join_with_separator() {
        let trail = vec![nav("a", "/a/", vec![]), nav("b", "/a/b/", vec![])];
        let html = render_breadcrumbs(&trail).into_string();
        assert!(html.contains(r#"<a href="/a/">A</a> › <a href="/a/b/">B</a>"#));
        assert_eq!(render_breadcrumbs(&[]).into_string(), "");
    }

    #[test]
    fn year_shortcode_uses_build_time() {
        let env = TestEnv::default();
        let out = Registry::with_builtins()
            .render_str("© {% year %}", &json!({}), &env.env())
            .unwrap();
        assert_eq!(out, "© 2026");
    }

    #[test]
    fn collection_shortcode_lists_pages() {
        let env = TestEnv::with_pages(vec![
            page("posts/b.md", Some("2024-02-20"), &["posts"]),
            page("posts/a.md", Some("2024-01-15"), &["posts"]),
        ]);
        let out = Registry::with_builtins()
            .render_str(r#"{% collection "posts" %}"#, &json!({}), &env.env())
            .unwrap();
        let a = out.find("/posts/a/").unwrap();
        let b = out.find("/posts/b/").unwrap();
        assert!(a < b, "sorted by date: {out}");
        assert!(out.contains(r#"<time datetime="2024-01-15">Jan 15, 2024</time>"#));
    }

    #[test]
    fn collection_shortcode_unknown_name_is_error() {
        let env = TestEnv::default();
        let result = Registry::with_builtins().render_str(
            r#"{% collection "nope" %}"#,
            &json!({}),
            &env.env(),
        );
        assert!(matches!(result, Err(TemplateError::Shortcode { .. })));
    }

    #[test]
    fn breadcrumbs_shortcode_uses_current_key() {
        let mut parent = page("docs.md", None, &[]);
        parent.item.front_matter.navigation = Some(nav_entry("docs", None));
        let mut child = page("docs/intro.md", None, &[]);
        child.item.front_matter.navigation = Some(nav_entry("intro", Some("docs")));
        let env = TestEnv::with_pages(vec![parent, child]);

        let mut render_env = env.env();
        render_env.nav_key = Some("intro");
        let out = Registry::with_builtins()
            .render_str("{% breadcrumbs %}", &json!({}), &render_env)
            .unwrap();
        assert!(out.contains(r#"<a href="/docs/">docs</a>"#), "{out}");
        assert!(!out.contains("intro"));
    }
}
