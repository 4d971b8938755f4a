//! GraphQL documents the site runs against the delivery API.
//!
//! Every page query selects the same page shape (SEO tags, title, first
//! publication date and the structured-text body with its blocks and
//! links) and differs only in how the page record is picked.

use pressroom_core::QueryDocument;

macro_rules! page_query {
    ($name:literal, $params:literal, $filter:literal) => {
        concat!(
            "query ",
            $name,
            $params,
            " {\n  page",
            $filter,
            r#" {
    _seoMetaTags { tag attributes content }
    title
    _firstPublishedAt
    structuredText {
      value
      blocks {
        ... on RecordInterface { id __typename }
        ... on ImageBlockRecord {
          asset {
            title
            responsiveImage(sizes: "(max-width: 700px) 100vw, 700px") {
              src srcSet width height alt title base64 sizes
            }
          }
        }
        ... on ImageGalleryBlockRecord {
          assets {
            id
            title
            responsiveImage(imgixParams: { w: 300 }, sizes: "300px") {
              src srcSet width height alt title base64 sizes
            }
          }
        }
        ... on VideoBlockRecord {
          asset {
            title
            video { muxPlaybackId title width height blurUpThumb }
          }
        }
      }
      links {
        ... on RecordInterface { id __typename }
        ... on PageRecord { title slug }
      }
    }
  }
}"#
        )
    };
}

/// Site-wide favicon tags, merged into every page's `<head>`.
pub const SITE: QueryDocument = QueryDocument {
    name: "SiteQuery",
    source: "query SiteQuery {\n  _site {\n    faviconMetaTags { tag attributes content }\n  }\n}",
};

/// The singleton page shown by `/basic`.
pub const BASIC_PAGE: QueryDocument = QueryDocument {
    name: "BasicPageQuery",
    source: page_query!("BasicPageQuery", "", ""),
};

/// A page by slug, shown by `/basic/page/{slug}`.
pub const BASIC_SLUG_PAGE: QueryDocument = QueryDocument {
    name: "BasicSlugPageQuery",
    source: page_query!(
        "BasicSlugPageQuery",
        "($slug: String!)",
        "(filter: { slug: { eq: $slug } })"
    ),
};

/// The singleton page shown by `/real-time-updates`.
pub const REALTIME_PAGE: QueryDocument = QueryDocument {
    name: "RealtimeUpdatesPageQuery",
    source: page_query!("RealtimeUpdatesPageQuery", "", ""),
};

/// A page by slug, shown by `/real-time-updates/{slug}`.
pub const REALTIME_SLUG_PAGE: QueryDocument = QueryDocument {
    name: "RealtimeUpdatesSlugPageQuery",
    source: page_query!(
        "RealtimeUpdatesSlugPageQuery",
        "($slug: String!)",
        "(filter: { slug: { eq: $slug } })"
    ),
};
