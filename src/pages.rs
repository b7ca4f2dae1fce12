//! Server-rendered HTML pages.
//!
//! Every dynamic value goes through [`escape`].

use crate::dto::CardView;
use crate::models::{Card, CardField, User};

/// Escapes text for use in HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Nakama</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #1e1e1e; color: #eee; margin: 0; padding: 2rem; }}
a {{ color: #8ab4f8; }}
.cards {{ display: flex; flex-wrap: wrap; gap: 1rem; }}
.card {{ background: #2a2a2a; border-radius: 8px; padding: 1rem; width: 220px; }}
.card img {{ width: 100%; border-radius: 4px; }}
.error {{ color: #f28b82; }}
table {{ border-collapse: collapse; font-size: 0.85rem; }}
td, th {{ border: 1px solid #444; padding: 0.25rem 0.5rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
        body = body
    )
}

/// Password form plus the Google sign-in link
pub fn login_page(error: Option<&str>, google_enabled: bool) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let google = if google_enabled {
        r#"<p><a href="/google-login">Sign in with Google</a></p>"#
    } else {
        ""
    };

    layout(
        "Login",
        &format!(
            r#"<h1>Nakama</h1>
{error}
<form method="post" action="/login">
<p><label>Username <input name="username" autocomplete="username" required></label></p>
<p><label>Password <input name="password" type="password" autocomplete="current-password" required></label></p>
<p><button type="submit">Sign in</button></p>
</form>
{google}"#
        ),
    )
}

fn card_tile(card: &CardView) -> String {
    format!(
        r#"<div class="card">
<img src="{url}" alt="{id}">
<h3>{name}</h3>
<p>{id} &middot; {card_type}</p>
<p>{chain} &middot; {theme}</p>
<p>{coins}</p>
<p>{usd}</p>
<p>{pack} &middot; {date} &middot; {status}</p>
</div>"#,
        url = escape(&card.url),
        id = escape(&card.card_id),
        name = escape(&card.name),
        card_type = escape(&card.card_type),
        chain = escape(&card.chain),
        theme = escape(&card.theme),
        coins = escape(&card.coins),
        usd = escape(&card.usd_amount),
        pack = escape(&card.pack_id),
        date = escape(&card.card_date),
        status = escape(&card.status),
    )
}

const ADMIN_CONTROLS: &str = r#"<section>
<h2>Administration</h2>
<p><a href="/table">Card table</a></p>
<p>
<button onclick="runPipeline('/run_create_cards')">Create cards</button>
<button onclick="runPipeline('/run_change_card_owner')">Apply ownership claims</button>
</p>
<pre id="pipeline-result"></pre>
<script>
async function runPipeline(path) {
  const out = document.getElementById('pipeline-result');
  out.textContent = 'Running...';
  const response = await fetch(path, { method: 'POST' });
  out.textContent = JSON.stringify(await response.json(), null, 2);
}
</script>
</section>"#;

/// The signed-in user's cards, plus admin controls for admins
pub fn profile_page(user: &User, cards: &[CardView]) -> String {
    let tiles = if cards.is_empty() {
        "<p>You do not own any cards yet.</p>".to_string()
    } else {
        cards.iter().map(card_tile).collect::<Vec<_>>().join("\n")
    };
    let admin = if user.is_admin() { ADMIN_CONTROLS } else { "" };

    layout(
        "Profile",
        &format!(
            r#"<h1>{username}</h1>
<p><a href="/logout">Sign out</a></p>
<h2>My cards</h2>
<div class="cards">
{tiles}
</div>
{admin}"#,
            username = escape(&user.get_username()),
        ),
    )
}

/// The live card table, refreshed from `/stream`
pub fn table_page() -> String {
    layout(
        "Cards",
        r#"<h1>Cards</h1>
<p><a href="/profile">Back to profile</a></p>
<table id="cards"><thead></thead><tbody></tbody></table>
<script>
function cell(tag, text) {
  const el = document.createElement(tag);
  el.textContent = text;
  return el;
}
function render(table) {
  const head = document.querySelector('#cards thead');
  const body = document.querySelector('#cards tbody');
  const row = document.createElement('tr');
  table.columns.forEach(c => row.appendChild(cell('th', c)));
  head.replaceChildren(row);
  body.replaceChildren(...table.records.map(record => {
    const tr = document.createElement('tr');
    table.columns.forEach(c => tr.appendChild(cell('td', record[c] ?? '')));
    return tr;
  }));
}
fetch('/get_users').then(r => r.json()).then(render);
new EventSource('/stream').onmessage = event => render(JSON.parse(event.data));
</script>"#,
    )
}

/// Landing page of a card's secret URL, inviting the visitor to claim it
pub fn claim_page(card: &Card, image_url: Option<&str>) -> String {
    let text = |field: CardField| escape(card.get(field).unwrap_or_default());
    let image = image_url
        .map(|url| format!(r#"<img src="{}" alt="{}">"#, escape(url), text(CardField::CardId)))
        .unwrap_or_default();

    layout(
        "Claim card",
        &format!(
            r#"<h1>{name}</h1>
<div class="card">
{image}
<p>{id} &middot; {card_type}</p>
<p>{description}</p>
<p>{coins}</p>
</div>
<p>This card has no owner yet.</p>
<p><a href="/google-login?next=add_card_owner">Sign in with Google to claim it</a></p>"#,
            name = text(CardField::Name),
            id = text(CardField::CardId),
            card_type = text(CardField::CardType),
            description = text(CardField::Description),
            coins = text(CardField::Coins),
        ),
    )
}

pub fn not_found_page() -> String {
    layout(
        "Not found",
        r#"<h1>404</h1>
<p>This page does not exist.</p>
<p><a href="/login">Go to login</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_login_page_escapes_error() {
        let page = login_page(Some("<script>alert(1)</script>"), false);
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>alert"));
        assert!(!page.contains("/google-login"));

        assert!(login_page(None, true).contains("/google-login"));
    }

    #[test]
    fn test_profile_page_admin_controls() {
        let admin = User::new("admin", None, Role::Admin);
        let user = User::new("bob@example.com", None, Role::User);

        assert!(profile_page(&admin, &[]).contains("/run_create_cards"));
        let page = profile_page(&user, &[]);
        assert!(!page.contains("/run_create_cards"));
        assert!(page.contains("bob@example.com"));
    }

    #[test]
    fn test_claim_page_shows_card() {
        let mut card = Card::new("Card_000042".to_string());
        card.set(CardField::Name, Some("Crown of <Shadows>".to_string()));

        let page = claim_page(&card, Some("/card_image/Card_000042.png"));
        assert!(page.contains("Crown of &lt;Shadows&gt;"));
        assert!(page.contains("/card_image/Card_000042.png"));
        assert!(page.contains("next=add_card_owner"));
    }
}
