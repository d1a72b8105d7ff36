//! Two toy tree APIs used to exercise variants and arrays.
//!
//! `graph1` reaches children one by one from a node and can collect them
//! into a list; `graph2` only hands out the child list.

use crate::builder::{LibraryBuilder, TransitionDraft};
use crate::error::ModelError;
use crate::model::Library;

pub fn graph1() -> Result<Library, ModelError> {
    let mut b = LibraryBuilder::new("graph1");
    let node = b.typed_role("Node", "Node1")?;
    let number = b.typed_role("Number", "int")?;
    let list = b.typed_role("NodeList", "List<Node1>")?;
    let ready = b.constructed(node);

    let get_node = b.add(
        TransitionDraft::call(ready, ready, "getNode")
            .entity("index", b.constructed(number))
            .significant(),
    )?;
    let get_num = b.add(TransitionDraft::call(ready, ready, "getNodeNum").significant())?;
    let get_parent = b.add(TransitionDraft::call(ready, ready, "getParent").significant())?;

    let parent = b.variant(node, "parent")?;
    let child = b.variant(node, "child")?;
    b.link(get_node, b.constructed(child))?;
    b.link(get_parent, b.constructed(parent))?;
    b.add(TransitionDraft::make_array(
        ready,
        b.constructed(list),
        get_num,
        get_node,
    ))?;
    b.build()
}

pub fn graph2() -> Result<Library, ModelError> {
    let mut b = LibraryBuilder::new("graph2");
    let node = b.typed_role("Node", "Node2")?;
    let number = b.typed_role("Number", "int")?;
    let list = b.typed_role("NodeList", "List<Node2>")?;
    let ready = b.constructed(node);
    let list_ready = b.constructed(list);

    let get_list = b.add(TransitionDraft::call(ready, ready, "getNodeList").significant())?;
    let get_parent = b.add(TransitionDraft::call(ready, ready, "getParentNode").significant())?;
    let get = b.add(
        TransitionDraft::call(list_ready, list_ready, "get")
            .entity("index", b.constructed(number))
            .significant(),
    )?;

    let parent = b.variant(node, "parent")?;
    let child = b.variant(node, "child")?;
    b.link(get_parent, b.constructed(parent))?;
    b.link(get_list, list_ready)?;
    b.link(get, b.constructed(child))?;
    b.build()
}
