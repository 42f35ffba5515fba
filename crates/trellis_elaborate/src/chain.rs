//! Chained connections through directional blocks.

use crate::block::{Child, PortTag};
use crate::connect::{ConnectTarget, Connectable, Endpoint, Net};
use crate::errors::{error_chain, ElabError, ElabResult};
use crate::ids::{BlockId, ChainId, PortId};
use crate::port::PortHandle;
use crate::session::{BlockState, ChainNode, Session};

/// One element of a chain: a port or net at either end, or a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChainItem {
    /// A port or net.
    Target(ConnectTarget),
    /// A child block, joined through its tagged ports.
    Block(BlockId),
}

/// Anything that can be passed to [`Session::chain`].
pub trait Chainable {
    /// The chain element this stands for.
    fn chain_item(&self) -> ChainItem;
}

impl<H: PortHandle> Chainable for H {
    fn chain_item(&self) -> ChainItem {
        ChainItem::Target(self.connect_target())
    }
}

impl Chainable for Net {
    fn chain_item(&self) -> ChainItem {
        ChainItem::Target(self.connect_target())
    }
}

impl<Io> Chainable for Child<Io> {
    fn chain_item(&self) -> ChainItem {
        ChainItem::Block(self.id())
    }
}

/// A registered chain and the nets joining its stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    /// The chain handle.
    pub id: ChainId,
    /// Nets between consecutive stages, in order. Bidirectional taps in the
    /// middle of the chain are not listed.
    pub links: Vec<Net>,
}

fn port_target(port: PortId) -> ConnectTarget {
    ConnectTarget::Endpoint(Endpoint::Port(port))
}

impl Session {
    /// Connects a sequence of elements: output to input through each middle
    /// block, or onto a shared net through bidirectional ones.
    pub fn chain(&mut self, items: &[&dyn Chainable]) -> ElabResult<Chain> {
        self.chain_inner(None, items)
    }

    /// As [`chain`](Self::chain), naming the chain.
    pub fn chain_named(&mut self, name: &str, items: &[&dyn Chainable]) -> ElabResult<Chain> {
        self.chain_inner(Some(name), items)
    }

    fn chain_inner(&mut self, name: Option<&str>, items: &[&dyn Chainable]) -> ElabResult<Chain> {
        let block = self.enclosing_block("chain(...)")?;
        self.check_phase(
            block,
            &[BlockState::Contents, BlockState::Generate],
            "chain(...)",
            "contents or generate",
        )?;
        let class = self.class_name(block).to_string();
        let chain_error = |msg: String| ElabError::Definition(error_chain(&class, &msg));

        let mut links = Vec::new();
        let items: Vec<ChainItem> = items.iter().map(|item| item.chain_item()).collect();
        if let Some((first, rest)) = items.split_first() {
            let Some((last, middle)) = rest.split_last() else {
                return Err(chain_error("chain needs at least two elements".into()));
            };
            let mut current = match first {
                ChainItem::Target(target) => *target,
                ChainItem::Block(b) => {
                    let ports = self.tagged_either(*b, PortTag::Output, PortTag::InOut);
                    match ports.as_slice() {
                        [port] => ConnectTarget::Endpoint(Endpoint::Port(*port)),
                        _ => {
                            return Err(chain_error(format!(
                                "first element to chain `{}` does not have exactly one InOut or Output port",
                                self.class_name(*b)
                            )))
                        }
                    }
                }
            };

            for (i, item) in middle.iter().enumerate() {
                let i = i + 1;
                let ChainItem::Block(b) = item else {
                    return Err(chain_error(format!("middle element {i} to chain must be a block")));
                };
                let b = *b;
                let inputs = self.tagged_ports(b, PortTag::Input);
                let outputs = self.tagged_ports(b, PortTag::Output);
                let inouts = self.tagged_ports(b, PortTag::InOut);
                if !inputs.is_empty() && !outputs.is_empty() {
                    let ([input], [output]) = (inputs.as_slice(), outputs.as_slice()) else {
                        return Err(chain_error(format!(
                            "element {i} to chain `{}` does not have exactly one Input and one Output port",
                            self.class_name(b)
                        )));
                    };
                    let (input, output) = (*input, *output);
                    links.push(self.connect(&[&current, &port_target(input)])?);
                    current = port_target(output);
                } else if !inouts.is_empty() {
                    let [inout] = inouts.as_slice() else {
                        return Err(chain_error(format!(
                            "element {i} to chain `{}` does not have exactly one InOut port",
                            self.class_name(b)
                        )));
                    };
                    let inout = *inout;
                    self.connect(&[&current, &port_target(inout)])?;
                } else {
                    return Err(chain_error(format!(
                        "element {i} to chain `{}` has no Input and Output, or InOut ports",
                        self.class_name(b)
                    )));
                }
            }

            let last = match last {
                ChainItem::Target(target) => *target,
                ChainItem::Block(b) => {
                    let ports = self.tagged_either(*b, PortTag::Input, PortTag::InOut);
                    match ports.as_slice() {
                        [port] => ConnectTarget::Endpoint(Endpoint::Port(*port)),
                        _ => {
                            return Err(chain_error(format!(
                                "last element to chain `{}` does not have exactly one InOut or Input port",
                                self.class_name(*b)
                            )))
                        }
                    }
                }
            };
            links.push(self.connect(&[&current, &last])?);
        }

        let id = self.chains.alloc(ChainNode {
            links: links.iter().map(Net::id).collect(),
        });
        let registry = &mut self.blocks[block].chains;
        let registered = match name {
            Some(name) => registry.insert(name, id),
            None => registry.register(id).map(|_| ()),
        };
        registered.map_err(|e| self.naming_error(block, e))?;
        Ok(Chain { id, links })
    }

    fn tagged_either(&self, block: BlockId, a: PortTag, b: PortTag) -> Vec<PortId> {
        let mut ports = self.tagged_ports(block, a);
        ports.extend(self.tagged_ports(block, b));
        ports
    }
}
