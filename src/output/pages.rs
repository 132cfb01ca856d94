use chrono::{Datelike, Utc};

use super::{detail_href, escape_html, SiteOptions};
use crate::model::Costume;
use crate::pipeline::{self, Query, SortKey, SortOrder, ALL_CATEGORIES};

const ALL_CATEGORIES_LABEL: &str = "すべての衣装";
const NO_IMAGE: &str = "No Image";
const NO_DESCRIPTION: &str = "説明なし";

fn layout(site: &SiteOptions, title: &str, body: &str) -> String {
    let site_title = escape_html(&site.title);
    let page_title = escape_html(title);
    let year = Utc::now().year();
    format!(
        r####"<!DOCTYPE html>
<html lang="ja">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{page_title}</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <link href="https://fonts.googleapis.com/css2?family=Noto+Serif+JP:wght@400;600&amp;display=swap" rel="stylesheet"/>
  <script id="tailwind-config">
    tailwind.config = {{
      theme: {{
        extend: {{
          colors: {{
            sage: {{ DEFAULT: "#8BA69C", light: "#A7BCB4", dark: "#6F8A80" }},
            sand: {{ DEFAULT: "#C7B7A3", light: "#D6CAB9", dark: "#B8A48D" }}
          }},
          fontFamily: {{
            serif: ["Noto Serif JP", "serif"]
          }}
        }}
      }}
    }};
  </script>
</head>
<body class="min-h-screen flex flex-col bg-gray-50">
  <header class="bg-sage-light">
    <div class="container mx-auto px-4 flex items-center justify-between h-20">
      <a href="/" class="font-serif text-2xl text-white">{site_title}</a>
    </div>
  </header>
  <main class="flex-grow">
{body}
  </main>
  <footer class="bg-gray-50 py-12">
    <div class="container mx-auto px-4 text-center">
      <p class="font-serif text-gray-600">&copy; {year} {site_title}. All rights reserved.</p>
    </div>
  </footer>
</body>
</html>
"####
    )
}

fn availability_badge(available: bool) -> &'static str {
    if available {
        r#"<span class="inline-block px-3 py-1 rounded-full text-sm font-serif bg-sage/10 text-sage">利用可能</span>"#
    } else {
        r#"<span class="inline-block px-3 py-1 rounded-full text-sm font-serif bg-red-50 text-red-600">利用不可</span>"#
    }
}

fn image_block(costume: &Costume, class: &str) -> String {
    if costume.image_url.is_empty() {
        format!(
            r#"<div class="w-full h-full bg-gray-100 flex items-center justify-center"><span class="text-gray-400 font-serif">{NO_IMAGE}</span></div>"#
        )
    } else {
        format!(
            r#"<img src="{}" alt="{}" loading="lazy" class="w-full h-full object-cover {class}"/>"#,
            escape_html(&costume.image_url),
            escape_html(&costume.name),
        )
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn selected(flag: bool) -> &'static str {
    if flag {
        " selected"
    } else {
        ""
    }
}

fn costume_card(costume: &Costume) -> String {
    let description = if costume.description.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        escape_html(&costume.description)
    };
    format!(
        r#"      <a href="{href}" class="bg-white rounded-lg overflow-hidden shadow-sm hover:shadow-md transition-shadow duration-300 group">
        <div class="relative aspect-[4/3]">{image}</div>
        <div class="p-6">
          <h2 class="text-xl font-serif text-gray-800 mb-2 group-hover:text-sage">{name}</h2>
          <p class="text-gray-600 text-sm mb-4 line-clamp-2">{description}</p>
          <div class="text-sm text-gray-500 font-serif">サイズ: {size} / 色: {color}</div>
          <div class="mt-2">{badge}</div>
        </div>
      </a>
"#,
        href = escape_html(&detail_href(&costume.id)),
        image = image_block(costume, "group-hover:scale-105 transition-transform duration-300"),
        name = escape_html(costume.display_name()),
        size = escape_html(or_dash(&costume.size)),
        color = escape_html(or_dash(&costume.color)),
        badge = availability_badge(costume.available),
    )
}

fn filter_form(all: &[Costume], query: &Query) -> String {
    let counts = pipeline::category_counts(all);
    let category_options: String = pipeline::categories(all)
        .iter()
        .map(|category| {
            let label = if category == ALL_CATEGORIES {
                format!("{ALL_CATEGORIES_LABEL} ({})", all.len())
            } else {
                format!(
                    "{} ({})",
                    escape_html(or_dash(category)),
                    counts.get(category.as_str()).copied().unwrap_or(0)
                )
            };
            format!(
                r#"<option value="{}"{}>{label}</option>"#,
                escape_html(category),
                selected(query.category.as_str() == category),
            )
        })
        .collect();

    let sort_options: String = [
        (SortKey::Default, "並び順"),
        (SortKey::Name, "名前順"),
        (SortKey::Size, "サイズ順"),
    ]
    .iter()
    .map(|(key, label)| {
        format!(
            r#"<option value="{}"{}>{label}</option>"#,
            key.as_str(),
            selected(query.sort == *key)
        )
    })
    .collect();

    let order_options: String = [(SortOrder::Asc, "昇順"), (SortOrder::Desc, "降順")]
        .iter()
        .map(|(order, label)| {
            format!(
                r#"<option value="{}"{}>{label}</option>"#,
                order.as_str(),
                selected(query.order == *order)
            )
        })
        .collect();

    let select_class = "w-full px-4 py-2 border border-sage rounded-md bg-white font-serif text-gray-700";
    format!(
        r#"    <form method="get" action="/" class="bg-white rounded-lg shadow-sm p-6 mb-12 grid grid-cols-1 md:grid-cols-2 lg:grid-cols-4 gap-4">
      <input type="text" name="q" value="{search}" placeholder="衣装を検索..." class="{select_class}"/>
      <select name="category" class="{select_class}" onchange="this.form.submit()">{category_options}</select>
      <select name="sort" class="{select_class}" onchange="this.form.submit()">{sort_options}</select>
      <select name="order" class="{select_class}" onchange="this.form.submit()">{order_options}</select>
    </form>
"#,
        search = escape_html(&query.search),
    )
}

/// Whether the listing can be re-queried by the server it came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListingMode {
    /// Served live; the filter form submits back to `/`.
    #[default]
    Interactive,
    /// Written once for a static host, which ignores query strings, so the
    /// filter form is left out and every costume is listed.
    Static,
}

/// The gallery: filter form, result count and the pipeline's view.
pub fn render_listing(
    site: &SiteOptions,
    all: &[Costume],
    query: &Query,
    mode: ListingMode,
) -> String {
    let visible = pipeline::apply(all, query);
    let cards: String = visible.iter().map(|c| costume_card(c)).collect();
    let empty = if visible.is_empty() {
        r#"    <div class="text-center py-12"><p class="font-serif text-gray-600">条件に一致する衣装が見つかりませんでした</p></div>
"#
    } else {
        ""
    };

    let body = format!(
        r#"  <div class="relative h-[30vh] bg-sage/10">
    <div class="container mx-auto px-4 h-full flex flex-col justify-center items-center text-center">
      <h1 class="text-3xl md:text-4xl font-serif text-gray-800 mb-2">{title}</h1>
    </div>
  </div>
  <div class="container mx-auto px-4 py-12">
{form}    <div class="mb-8 text-center"><p class="font-serif text-gray-600">{count}点の衣装が見つかりました</p></div>
    <div class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-8">
{cards}    </div>
{empty}  </div>"#,
        title = escape_html(&site.title),
        form = match mode {
            ListingMode::Interactive => filter_form(all, query),
            ListingMode::Static => String::new(),
        },
        count = visible.len(),
    );
    layout(site, &site.title, &body)
}

pub fn render_detail(site: &SiteOptions, costume: &Costume) -> String {
    let row = |label: &str, value: &str| {
        format!(
            r#"          <div class="grid grid-cols-3 gap-4"><div class="col-span-1 font-serif text-gray-500">{label}</div><div class="col-span-2 font-serif">{}</div></div>
"#,
            escape_html(value)
        )
    };
    let body = format!(
        r#"  <div class="container mx-auto px-4 py-12">
    <a href="/" class="inline-flex items-center text-sage hover:text-sage-dark mb-8 font-serif">&larr; 一覧に戻る</a>
    <div class="bg-white rounded-lg shadow-sm overflow-hidden grid grid-cols-1 lg:grid-cols-2 gap-8">
      <div class="relative aspect-square lg:aspect-auto">{image}</div>
      <div class="p-8">
        <h1 class="text-3xl font-serif text-gray-800 mb-2">{name}</h1>
        <div class="mb-4">{badge}</div>
        <p class="text-gray-600 leading-relaxed">{description}</p>
        <div class="space-y-4 border-t border-gray-100 pt-6 mt-6">
{category}{size}{color}        </div>
        <div class="mt-8">
          <a href="{booking}" target="_blank" rel="noopener" class="inline-block bg-sage text-white px-8 py-3 rounded-md font-serif hover:bg-sage-dark">予約・お問い合わせ</a>
        </div>
      </div>
    </div>
  </div>"#,
        image = image_block(costume, "lg:h-full"),
        name = escape_html(costume.display_name()),
        badge = availability_badge(costume.available),
        description = escape_html(&costume.description),
        category = row("カテゴリー", &costume.category),
        size = row("サイズ", &costume.size),
        color = row("色", &costume.color),
        booking = escape_html(&site.booking_url),
    );
    let title = format!("{} | {}", costume.display_name(), site.title);
    layout(site, &title, &body)
}

pub fn render_not_found(site: &SiteOptions) -> String {
    let body = r#"  <div class="container mx-auto px-4 py-24 text-center">
    <h1 class="text-3xl font-serif text-gray-800 mb-4">404</h1>
    <p class="font-serif text-gray-600 mb-8">お探しの衣装は見つかりませんでした</p>
    <a href="/" class="text-sage hover:text-sage-dark font-serif">一覧に戻る</a>
  </div>"#;
    layout(site, "Not Found", body)
}

pub fn render_error(site: &SiteOptions) -> String {
    let body = r#"  <div class="container mx-auto px-4 py-24 text-center">
    <h1 class="text-3xl font-serif text-gray-800 mb-4">500</h1>
    <p class="font-serif text-gray-600">ページを表示できませんでした。しばらくしてから再度お試しください。</p>
  </div>"#;
    layout(site, "Error", body)
}
