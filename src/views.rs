use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, TimeDelta, Utc};
use tera::{Context, Tera};
use tracing::error;

/// Pages are always rendered for one signed-in user from live data
const PAGE_CACHE_POLICY: &str = "private, no-cache";
/// Dates are shown in Japan Standard Time
const DISPLAY_OFFSET_HOURS: i64 = 9;

const TEMPLATES: [(&str, &str); 9] = [
    ("base.html", include_str!("../templates/base.html")),
    ("signin.html", include_str!("../templates/signin.html")),
    ("signup.html", include_str!("../templates/signup.html")),
    ("todos.html", include_str!("../templates/todos.html")),
    ("task_form.html", include_str!("../templates/task_form.html")),
    ("task_detail.html", include_str!("../templates/task_detail.html")),
    ("mypage.html", include_str!("../templates/mypage.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

/// Formats a timestamp as a date, e.g. "2024/4/1"
pub fn display_date(at: DateTime<Utc>) -> String {
    local_time(at).format("%Y/%-m/%-d").to_string()
}

/// Formats a timestamp with its time of day, e.g. "2024/4/1 18:00:00"
pub fn display_datetime(at: DateTime<Utc>) -> String {
    local_time(at).format("%Y/%-m/%-d %-H:%M:%S").to_string()
}

fn local_time(at: DateTime<Utc>) -> chrono::NaiveDateTime {
    (at + TimeDelta::hours(DISPLAY_OFFSET_HOURS)).naive_utc()
}

/// The compiled page templates
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;

        Ok(Views { tera })
    }

    /// Starts the variables for a page. Every page needs to know whether to show the signed-in navigation.
    pub fn context(signed_in: bool) -> Context {
        let mut context = Context::new();
        context.insert("signed_in", &signed_in);
        context.insert("error", &Option::<String>::None);

        context
    }

    pub fn render(&self, template: &str, context: &Context) -> Response {
        self.render_with_status(StatusCode::OK, template, context)
    }

    pub fn render_with_status(
        &self,
        status: StatusCode,
        template: &str,
        context: &Context,
    ) -> Response {
        match self.tera.render(template, context) {
            Ok(page) => (
                status,
                [(CACHE_CONTROL, HeaderValue::from_static(PAGE_CACHE_POLICY))],
                Html(page),
            )
                .into_response(),
            Err(render_err) => {
                error!(template, "Could not render page: {render_err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "エラーが発生しました",
                )
                    .into_response()
            }
        }
    }

    pub fn not_found(&self, signed_in: bool) -> Response {
        self.render_with_status(
            StatusCode::NOT_FOUND,
            "not_found.html",
            &Self::context(signed_in),
        )
    }

    /// The generic error page, optionally explaining what went wrong
    pub fn error_page(&self, status: StatusCode, message: Option<&str>, signed_in: bool) -> Response {
        let mut context = Self::context(signed_in);
        context.insert("error", &message);

        self.render_with_status(status, "error.html", &context)
    }
}
