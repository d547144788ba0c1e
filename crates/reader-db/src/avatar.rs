use url::Url;

/// Image proxy used to resize avatars that aren't served by Gravatar.
const IMAGE_PROXY: &str = "https://i0.wp.com";

/// Gravatar's fallback image when the user has none ("mystery person").
const GRAVATAR_DEFAULT_IMAGE: &str = "mm";

/// Rewrite an avatar URL so the server returns a `size`×`size` image.
pub fn rewrite_avatar_url(avatar_url: &str, size: u32) -> String {
    if avatar_url.is_empty() {
        return String::new();
    }

    let Ok(mut url) = Url::parse(avatar_url) else {
        return avatar_url.to_string();
    };
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return avatar_url.to_string();
    };

    if is_gravatar_host(&host) {
        url.set_query(Some(&format!("s={}&d={}", size, GRAVATAR_DEFAULT_IMAGE)));
        url.set_fragment(None);
        return url.to_string();
    }

    if is_proxied_host(&host) {
        url.set_query(Some(&format!("w={}&h={}", size, size)));
        url.set_fragment(None);
        return url.to_string();
    }

    format!("{}/{}{}?w={}&h={}", IMAGE_PROXY, host, url.path(), size, size)
}

fn is_gravatar_host(host: &str) -> bool {
    host == "gravatar.com" || host.ends_with(".gravatar.com")
}

fn is_proxied_host(host: &str) -> bool {
    host.ends_with(".wp.com") || host.ends_with(".files.wordpress.com")
}
