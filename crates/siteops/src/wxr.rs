//! WordPress eXtended RSS (WXR 1.2) seed content generator.
//!
//! Produces an import file with a fixed set of categories and demo posts so a
//! fresh WordPress install has something for the frontend to render.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

const NS_EXCERPT: &str = "http://wordpress.org/export/1.2/excerpt/";
const NS_CONTENT: &str = "http://purl.org/rss/1.0/modules/content/";
const NS_WFW: &str = "http://wellformedweb.org/CommentAPI/";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_WP: &str = "http://wordpress.org/export/1.2/";

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("valid regex"));

/// A WordPress category term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// Must match the slug configured in WordPress.
    pub slug: String,
}

/// One seed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedArticle {
    /// Category name, looked up in the document's category list.
    pub category: String,
    pub title: String,
}

/// Channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub title: String,
    pub url: String,
    pub description: String,
    pub language: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "icoffio demo content".to_string(),
            url: "https://icoffio.com".to_string(),
            description: "Seed posts for icoffio".to_string(),
            language: "ru-RU".to_string(),
        }
    }
}

/// Builds a WXR document.
#[derive(Debug, Clone)]
pub struct WxrBuilder {
    site: SiteInfo,
    categories: Vec<Category>,
    articles: Vec<SeedArticle>,
    images: Vec<String>,
    author: String,
}

impl WxrBuilder {
    pub fn new(site: SiteInfo) -> Self {
        Self {
            site,
            categories: Vec::new(),
            articles: Vec::new(),
            images: Vec::new(),
            author: "admin".to_string(),
        }
    }

    /// Builder preloaded with the built-in seed set.
    pub fn with_seed_content(site: SiteInfo) -> Self {
        let mut builder = Self::new(site);
        for (name, slug) in SEED_CATEGORIES {
            builder = builder.category(name, slug);
        }
        for (category, title) in SEED_TITLES {
            builder = builder.article(category, title);
        }
        builder.images = SEED_IMAGES.iter().map(ToString::to_string).collect();
        builder
    }

    #[must_use]
    pub fn category(mut self, name: &str, slug: &str) -> Self {
        self.categories.push(Category {
            name: name.to_string(),
            slug: slug.to_string(),
        });
        self
    }

    #[must_use]
    pub fn article(mut self, category: &str, title: &str) -> Self {
        self.articles.push(SeedArticle {
            category: category.to_string(),
            title: title.to_string(),
        });
        self
    }

    #[must_use]
    pub fn image(mut self, url: &str) -> Self {
        self.images.push(url.to_string());
        self
    }

    #[must_use]
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    fn category_slug(&self, name: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map_or_else(|| name.to_lowercase(), |c| c.slug.clone())
    }

    /// Render the document. Article `i` is dated `now - i days`.
    #[must_use]
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        let site = &self.site;

        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        let _ = writeln!(
            out,
            "<rss version=\"2.0\" xmlns:excerpt=\"{NS_EXCERPT}\" xmlns:content=\"{NS_CONTENT}\" \
             xmlns:wfw=\"{NS_WFW}\" xmlns:dc=\"{NS_DC}\" xmlns:wp=\"{NS_WP}\">"
        );
        out.push_str("  <channel>\n");
        element(&mut out, 4, "title", &site.title);
        element(&mut out, 4, "link", &site.url);
        element(&mut out, 4, "description", &site.description);
        element(&mut out, 4, "language", &site.language);
        element(&mut out, 4, "wp:wxr_version", "1.2");
        element(&mut out, 4, "wp:base_site_url", &site.url);
        element(&mut out, 4, "wp:base_blog_url", &site.url);

        for category in &self.categories {
            out.push_str("    <wp:category>\n");
            element(&mut out, 6, "wp:category_nicename", &category.slug);
            element(&mut out, 6, "wp:cat_name", &category.name);
            out.push_str("    </wp:category>\n");
        }

        let base = site.url.trim_end_matches('/');
        for (i, article) in self.articles.iter().enumerate() {
            let slug = slugify(&article.title).unwrap_or_else(|| format!("demo-{}", i + 1));
            let days = i64::try_from(i).unwrap_or(i64::MAX);
            let published = now - Duration::days(days);
            let post_date = published.format("%Y-%m-%d %H:%M:%S").to_string();
            let category_slug = self.category_slug(&article.category);

            out.push_str("    <item>\n");
            element(&mut out, 6, "title", &article.title);
            element(&mut out, 6, "wp:post_name", &slug);
            element(&mut out, 6, "link", &format!("{base}/article/{slug}"));
            element(
                &mut out,
                6,
                "pubDate",
                &published.format("%a, %d %b %Y %H:%M:%S +0000").to_string(),
            );
            element(&mut out, 6, "wp:post_date", &post_date);
            element(&mut out, 6, "wp:post_date_gmt", &post_date);
            element(&mut out, 6, "wp:status", "publish");
            element(&mut out, 6, "wp:post_type", "post");
            element(&mut out, 6, "wp:comment_status", "closed");
            element(&mut out, 6, "wp:ping_status", "closed");
            let _ = writeln!(
                out,
                "      <category domain=\"category\" nicename=\"{}\">{}</category>",
                escape(&category_slug),
                escape(&article.category)
            );
            element(
                &mut out,
                6,
                "excerpt:encoded",
                &format!(
                    "Короткий анонс: {}. Практичные выводы и ссылки внутри.",
                    article.title
                ),
            );
            element(&mut out, 6, "content:encoded", &self.content_html(i, article));
            element(&mut out, 6, "dc:creator", &self.author);
            out.push_str("    </item>\n");
        }

        out.push_str("  </channel>\n");
        out.push_str("</rss>\n");
        out
    }

    fn content_html(&self, index: usize, article: &SeedArticle) -> String {
        let mut html = String::new();
        if !self.images.is_empty() {
            let image = &self.images[index % self.images.len()];
            let _ = writeln!(html, "<p><img src=\"{image}\" alt=\"\" /></p>");
        }
        let _ = writeln!(html, "<p><strong>{}</strong></p>", article.title);
        html.push_str(
            "<p>Демо‑контент для настройки фронтенда. Суть: что произошло, почему важно и что делать читателю.</p>\n",
        );
        html.push_str(
            "<p>Тестовая публикация: предназначена только для проверки макета и ленты.</p>",
        );
        html
    }
}

/// Latin slug from a title; `None` when nothing Latin or numeric remains.
#[must_use]
pub fn slugify(title: &str) -> Option<String> {
    let lowered = title.to_lowercase().replace(['—', '–'], "-");
    let slug = NON_SLUG_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    (!slug.is_empty()).then(|| slug.to_string())
}

fn element(out: &mut String, indent: usize, name: &str, text: &str) {
    let _ = writeln!(out, "{:indent$}<{name}>{}</{name}>", "", escape(text));
}

/// Escape text for element content and attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

const SEED_CATEGORIES: [(&str, &str); 5] = [
    ("Tech", "tech"),
    ("Apple", "apple"),
    ("Games", "games"),
    ("AI", "ai"),
    ("News", "news-2"),
];

const SEED_IMAGES: [&str; 5] = [
    "https://images.unsplash.com/photo-1518770660439-4636190af475?q=80&w=1200&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1498050108023-c5249f4df085?q=80&w=1200&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1517336714731-489689fd1ca8?q=80&w=1200&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1512428559087-560fa5ceab42?q=80&w=1200&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1510557880182-3d4d3cba35a5?q=80&w=1200&auto=format&fit=crop",
];

const SEED_TITLES: [(&str, &str); 15] = [
    ("AI", "Нейросети в кармане: как смартфоны понимают речь"),
    ("Tech", "Тонкие ноутбуки 2025: что важно при выборе"),
    ("Apple", "iOS 19: пять функций, которые экономят время"),
    ("Games", "Инди‑хиты месяца: что поиграть на выходных"),
    ("News", "Гаджет недели: смарт‑кольцо с датчиком температуры"),
    ("AI", "Где хранить свои модели: сравнение облаков для ML"),
    ("Tech", "Переходим на USB‑C полностью: опыт и лайфхаки"),
    ("Apple", "MacBook для видео: базовый сетап без боли"),
    ("Games", "Почему ретро‑консоли снова в моде"),
    ("News", "Мини‑обзор: наушники с кейсом‑мышкой — удобно ли это?"),
    ("AI", "Локальные LLM: когда офлайн лучше, чем облако"),
    ("Tech", "Мониторы 27–32″: комфортная работа без усталости"),
    ("Apple", "Vision‑динамика: где AR реально полезна"),
    ("Games", "Геймпады и аксессуары: что взять новичку"),
    ("News", "Смарт‑дом 2025: сценарии, которые работают"),
];

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("iOS 19: пять функций"), Some("ios-19".to_string()));
        assert_eq!(
            slugify("Мониторы 27–32″: комфортная"),
            Some("27-32".to_string())
        );
        assert_eq!(slugify("Нейросети в кармане"), None);
        assert_eq!(slugify("Local LLMs — offline"), Some("local-llms-offline".to_string()));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a & <b> \"c\""), "a &amp; &lt;b&gt; &quot;c&quot;");
    }

    #[test]
    fn test_seed_document_shape() {
        let builder = WxrBuilder::with_seed_content(SiteInfo::default());
        let xml = builder.render(now());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("xmlns:wp=\"http://wordpress.org/export/1.2/\""));
        assert_eq!(xml.matches("<item>").count(), 15);
        assert_eq!(xml.matches("<wp:category>").count(), 5);
        assert!(xml.contains("<wp:category_nicename>news-2</wp:category_nicename>"));
        assert!(xml.trim_end().ends_with("</rss>"));
    }

    #[test]
    fn test_article_fields() {
        let xml = WxrBuilder::new(SiteInfo::default())
            .category("Apple", "apple")
            .category("AI", "ai")
            .article("AI", "Нейросети в кармане")
            .article("Apple", "iOS 19: пять функций")
            .image("https://img.example.org/a.jpg?w=1&h=2")
            .render(now());

        // First article has no Latin characters and falls back to a numbered slug.
        assert!(xml.contains("<wp:post_name>demo-1</wp:post_name>"));
        assert!(xml.contains("<link>https://icoffio.com/article/ios-19</link>"));
        assert!(xml.contains("<pubDate>Mon, 10 Mar 2025 12:00:00 +0000</pubDate>"));
        assert!(xml.contains("<wp:post_date>2025-03-09 12:00:00</wp:post_date>"));
        assert!(xml.contains(
            "<category domain=\"category\" nicename=\"apple\">Apple</category>"
        ));
        assert!(xml.contains("&lt;img src=&quot;https://img.example.org/a.jpg?w=1&amp;h=2&quot;"));
        assert!(xml.contains("<dc:creator>admin</dc:creator>"));
    }
}
