/// `/v2/<name>/blobs/uploads/<session_id>`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobUploadPath<'a> {
    pub name: &'a str,
    pub session_id: &'a str,
}

impl<'a> BlobUploadPath<'a> {
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/v2/")?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let (name, session_id) = rest.rsplit_once("/blobs/uploads/")?;

        if !is_valid_repository_name(name) || !is_valid_session_id(session_id) {
            return None;
        }

        Some(Self { name, session_id })
    }
}

/// `/v2/<name>/manifests/<reference>`, where reference is a tag or a digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManifestPath<'a> {
    pub name: &'a str,
    pub reference: &'a str,
}

impl<'a> ManifestPath<'a> {
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/v2/")?;
        let (name, reference) = rest.rsplit_once("/manifests/")?;

        if !is_valid_repository_name(name) || !is_valid_reference(reference) {
            return None;
        }

        Some(Self { name, reference })
    }
}

/// Repository names are `/`-separated components of `[a-z0-9]+` joined by a
/// separator: `.`, `_`, `__`, or any run of `-`.
pub fn is_valid_repository_name(name: &str) -> bool {
    !name.is_empty() && name.split('/').all(is_valid_component)
}

fn is_valid_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if !is_alnum(*first) || !is_alnum(*last) {
        return false;
    }

    bytes
        .split(|b| is_alnum(*b))
        .filter(|run| !run.is_empty())
        .all(is_valid_separator)
}

fn is_valid_separator(run: &[u8]) -> bool {
    matches!(run, b"." | b"_" | b"__") || run.iter().all(|b| *b == b'-')
}

fn is_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'='))
}

fn is_valid_reference(reference: &str) -> bool {
    if reference.contains(':') {
        return crate::digest::Digest::parse(reference).is_ok();
    }

    // tag: [\w][\w.-]{0,127}
    let bytes = reference.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => {}
        _ => return false,
    }
    bytes.len() <= 128
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// Project owning a repository: the first path component, or the whole name
/// when the repository has a single component.
pub fn project_name(repository: &str) -> &str {
    match repository.split_once('/') {
        Some((project, _)) => project,
        None => repository,
    }
}
