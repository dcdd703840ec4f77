use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use gitreader_api_types::ProductView;
use thiserror::Error;

use crate::application::error::HttpError;
use crate::application::suggestions::POPULAR_QUERIES;
use crate::domain::routes::PageRoute;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Shared page chrome.
#[derive(Clone)]
pub struct LayoutChrome {
    pub title: String,
    pub description: String,
    pub version: &'static str,
}

impl LayoutChrome {
    pub fn for_route(route: PageRoute) -> Self {
        let title = match route {
            PageRoute::Explorer => "GitReader",
            PageRoute::CheckoutSuccess => "Thank you · GitReader",
            PageRoute::CheckoutCancel => "Checkout cancelled · GitReader",
        };
        Self {
            title: title.to_string(),
            description: "Search GitHub repositories and read their READMEs.".to_string(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone)]
pub struct ProductCard {
    pub price_id: String,
    pub name: String,
    pub description: String,
}

impl From<&ProductView> for ProductCard {
    fn from(product: &ProductView) -> Self {
        Self {
            price_id: product.price_id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
        }
    }
}

pub struct ExplorerView {
    pub popular: Vec<&'static str>,
    pub products: Vec<ProductCard>,
    pub checkout_enabled: bool,
    pub sign_in_enabled: bool,
}

impl ExplorerView {
    pub fn new(products: &[ProductView], checkout_enabled: bool, sign_in_enabled: bool) -> Self {
        Self {
            popular: POPULAR_QUERIES.to_vec(),
            products: products.iter().map(ProductCard::from).collect(),
            checkout_enabled,
            sign_in_enabled,
        }
    }

    pub fn show_donations(&self) -> bool {
        self.checkout_enabled && !self.products.is_empty()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: LayoutChrome,
    pub view: ExplorerView,
}

#[derive(Template)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub chrome: LayoutChrome,
}

#[derive(Template)]
#[template(path = "cancel.html")]
pub struct CancelTemplate {
    pub chrome: LayoutChrome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitreader_api_types::CheckoutMode;

    fn product() -> ProductView {
        ProductView {
            id: "prod_1".to_string(),
            price_id: "price_1".to_string(),
            name: "Coffee".to_string(),
            description: "One <strong> coffee".to_string(),
            mode: CheckoutMode::Payment,
        }
    }

    #[test]
    fn index_lists_popular_topics_and_escapes_products() {
        let html = IndexTemplate {
            chrome: LayoutChrome::for_route(PageRoute::Explorer),
            view: ExplorerView::new(&[product()], true, true),
        }
        .render()
        .expect("render");

        assert!(html.contains("machine learning"));
        assert!(html.contains("data-price-id=\"price_1\""));
        assert!(html.contains("One &lt;strong&gt; coffee") || html.contains("One &#60;strong&#62; coffee"));
        assert!(html.contains("/api/theme/light.css"));
    }

    #[test]
    fn donations_hidden_when_checkout_disabled() {
        let html = IndexTemplate {
            chrome: LayoutChrome::for_route(PageRoute::Explorer),
            view: ExplorerView::new(&[product()], false, false),
        }
        .render()
        .expect("render");

        assert!(!html.contains("data-price-id"));
    }

    #[test]
    fn account_controls_follow_sign_in_setting() {
        let enabled = IndexTemplate {
            chrome: LayoutChrome::for_route(PageRoute::Explorer),
            view: ExplorerView::new(&[product()], true, true),
        }
        .render()
        .expect("render");
        assert!(enabled.contains("id=\"auth-form\""));
        assert!(enabled.contains("id=\"sign-out\""));
        assert!(enabled.contains("/api/auth/token"));

        let disabled = IndexTemplate {
            chrome: LayoutChrome::for_route(PageRoute::Explorer),
            view: ExplorerView::new(&[product()], true, false),
        }
        .render()
        .expect("render");
        assert!(!disabled.contains("id=\"auth-form\""));
        assert!(disabled.contains("Sign-in is not configured"));
    }

    #[test]
    fn result_pages_render() {
        let success = SuccessTemplate {
            chrome: LayoutChrome::for_route(PageRoute::CheckoutSuccess),
        }
        .render()
        .expect("render");
        assert!(success.contains("Thank you"));

        let cancel = CancelTemplate {
            chrome: LayoutChrome::for_route(PageRoute::CheckoutCancel),
        }
        .render()
        .expect("render");
        assert!(cancel.contains("cancelled"));
    }
}
