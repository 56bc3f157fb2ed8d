use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::remote::{fetch_all_templates, RemoteClient};

pub fn list<R: RemoteClient + ?Sized>(remote: &R) -> Result<CmdResult> {
    let templates = fetch_all_templates(remote)?;
    let mut result = CmdResult::default();
    if templates.is_empty() {
        result.add_message(CmdMessage::info("No templates found."));
    }
    Ok(result.with_templates(templates))
}

pub fn get<R: RemoteClient + ?Sized>(remote: &R, id: &str) -> Result<CmdResult> {
    let template = remote.get_template(id)?;
    Ok(CmdResult::default().with_templates(vec![template]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MochiError;
    use crate::remote::memory::InMemoryRemote;

    #[test]
    fn test_list_and_get() {
        let remote = InMemoryRemote::new();
        let basic = remote.seed_template("Basic");

        let listed = list(&remote).unwrap();
        assert_eq!(listed.templates.len(), 1);

        let fetched = get(&remote, &basic.id).unwrap();
        assert_eq!(fetched.templates[0].name, "Basic");
    }

    #[test]
    fn test_get_missing() {
        let remote = InMemoryRemote::new();
        assert!(matches!(get(&remote, "t9"), Err(MochiError::NotFound(_))));
    }
}
