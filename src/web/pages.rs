use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub repos: Vec<String>,
}

#[derive(Template)]
#[template(path = "repo.html")]
pub struct RepoPage {
    pub repo_name: String,
    pub branches: Vec<String>,
}

#[derive(Template)]
#[template(path = "build.html")]
pub struct BuildPage {
    pub repo_name: String,
    pub branch: String,
    pub needs_build: bool,
    pub plist_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_links_each_repository() {
        let html = IndexPage {
            repos: vec!["alpha".to_string(), "beta".to_string()],
        }
        .render()
        .unwrap();
        assert!(html.contains("/repo/alpha"));
        assert!(html.contains("/repo/beta"));
    }

    #[test]
    fn repo_page_links_branch_status() {
        let html = RepoPage {
            repo_name: "alpha".to_string(),
            branches: vec!["main".to_string()],
        }
        .render()
        .unwrap();
        assert!(html.contains("/repo/alpha/main/get"));
    }

    #[test]
    fn build_page_offers_trigger_when_unbuilt() {
        let html = BuildPage {
            repo_name: "alpha".to_string(),
            branch: "main".to_string(),
            needs_build: true,
            plist_url: "http://host/repo/alpha/main/application.plist".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("/repo/alpha/main/build"));
        assert!(!html.contains("itms-services"));
    }

    #[test]
    fn build_page_offers_install_link_when_built() {
        let html = BuildPage {
            repo_name: "alpha".to_string(),
            branch: "main".to_string(),
            needs_build: false,
            plist_url: "http://host/repo/alpha/main/application.plist".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("itms-services://?action=download-manifest"));
        assert!(html.contains("application.ipa"));
    }
}
