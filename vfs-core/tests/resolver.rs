use vfs_core::error::VfsErrorKind;
use vfs_core::graph::InodeGraph;
use vfs_core::name::VfsName;
use vfs_core::path::{resolve, ResolveContext, DEFAULT_SYMLINK_HOP_BOUND};

fn name(bytes: &[u8]) -> VfsName {
    VfsName::new(bytes).expect("name")
}

fn ctx(root: vfs_core::LinkId, base: vfs_core::LinkId) -> ResolveContext {
    ResolveContext {
        root,
        base,
        follow_final_symlink: true,
        symlink_hop_bound: DEFAULT_SYMLINK_HOP_BOUND,
    }
}

#[test]
fn canonical_path_variants_agree() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let a = graph.new_dir(root, name(b"a"))?;
    let b = graph.new_dir(a, name(b"b"))?;
    let file = graph.new_file(b, name(b"c.txt"), b"hello\n".to_vec())?;

    for candidate in [
        "/a/b/c.txt",
        "/a/./b/c.txt",
        "/a/././b/c.txt",
        "/a//b/c.txt",
    ] {
        let resolved = resolve(&graph, &ctx(root, root), candidate.as_bytes())?;
        assert_eq!(resolved, file, "path {candidate} should resolve to the same link");
    }
    Ok(())
}

#[test]
fn parent_round_trip_through_new_dir() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let child = graph.new_dir(root, name(b"child"))?;
    let parent = resolve(&graph, &ctx(root, child), b"..")?;
    let root_node = graph.link(root)?.node;
    let parent_node = graph.link(parent)?.node;
    assert_eq!(root_node, parent_node);
    Ok(())
}

#[test]
fn dotdot_at_root_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    graph.new_dir(root, name(b"usr"))?;
    let at_root = resolve(&graph, &ctx(root, root), b"..")?;
    assert_eq!(at_root, root);
    Ok(())
}

#[test]
fn parent_escape_is_contained_within_mount() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let usr = graph.new_dir(root, name(b"usr"))?;
    let local = graph.new_dir(usr, name(b"local"))?;
    let bin = graph.new_dir(local, name(b"bin"))?;
    let hey = graph.new_file(usr, name(b"hey"), b"hey".to_vec())?;

    let resolved = resolve(&graph, &ctx(root, bin), b"../hey")?;
    assert_eq!(resolved, hey);
    Ok(())
}

#[test]
fn trailing_slash_requires_directory() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    graph.new_file(root, name(b"file"), b"x".to_vec())?;
    let err = resolve(&graph, &ctx(root, root), b"file/").unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::NotDir);
    Ok(())
}

#[test]
fn symlink_chain_bound_succeeds_then_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    graph.new_file(root, name(b"target"), b"end".to_vec())?;

    // Build a chain link_32 -> link_31 -> ... -> link_0 -> target.
    let mut previous_name = b"target".to_vec();
    for i in 0..32 {
        let link_name = format!("link_{i}");
        graph.new_symlink(root, name(link_name.as_bytes()), previous_name.clone())?;
        previous_name = link_name.into_bytes();
    }
    let final_name = format!("/{}", String::from_utf8(previous_name.clone()).unwrap());
    // 32 hops resolves successfully.
    resolve(&graph, &ctx(root, root), final_name.as_bytes())?;

    // One more hop exceeds the bound.
    graph.new_symlink(root, name(b"link_32"), previous_name)?;
    let err = resolve(&graph, &ctx(root, root), b"/link_32").unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::Loop);
    Ok(())
}

#[test]
fn nonascii_name_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let filename = "emoji-\u{1f43c}-\u{1f436}-\u{1f431}.txt";
    let body = "Cute animals \u{1f42d}\n".as_bytes().to_vec();
    graph.new_file(root, name(filename.as_bytes()), body.clone())?;

    let resolved = resolve(&graph, &ctx(root, root), format!("/{filename}").as_bytes())?;
    let node = graph.link(resolved)?.node;
    let mut buf = vec![0u8; body.len()];
    let read = graph.read_at(node, 0, &mut buf)?;
    assert_eq!(read, body.len());
    assert_eq!(buf, body);
    Ok(())
}
