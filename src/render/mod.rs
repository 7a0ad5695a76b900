//! HTML dashboard rendering
//!
//! Server-side rendering with Tera templates embedded at compile time, fed
//! by the view models built from a [`Lookup`].

pub mod view_models;

use tera::{Context, Tera};

use crate::services::Lookup;
use self::view_models::dashboard_view;

const TPL_BASE: &str = include_str!("templates/base.html");
const TPL_DASHBOARD: &str = include_str!("templates/dashboard.html");

pub struct DashboardRenderer {
    templates: Tera,
}

impl DashboardRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        // base.html must be registered before the templates extending it
        tera.add_raw_template("base.html", TPL_BASE)?;
        tera.add_raw_template("dashboard.html", TPL_DASHBOARD)?;

        Ok(Self { templates: tera })
    }

    pub fn render(&self, lookup: &Lookup) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("vm", &dashboard_view(lookup));
        self.templates.render("dashboard.html", &context)
    }
}
