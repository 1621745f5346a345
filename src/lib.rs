#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod core;
pub mod hl;
mod utils {
    pub mod arena;
}

pub use self::{
    core::{
        avl::{Avl, Height},
        rbtree::{Color, Coloring, RedBlack},
        splay::Splay,
        treap::{Priority, Treap},
        Augment, Forest, InvariantError, Node, NodeId, Root, Strategy,
    },
    hl::Tree,
};
